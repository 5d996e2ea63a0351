//! JSON HTTP API over the service layer.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod types;

pub use error::ApiError;
pub use router::clinic_api_router;
pub use types::{ActorContext, ApiContext};
