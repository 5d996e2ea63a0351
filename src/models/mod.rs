pub mod appointment;
pub mod enums;
pub mod patient;
pub mod user;

pub use appointment::*;
pub use patient::*;
pub use user::*;
