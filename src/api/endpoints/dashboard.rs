//! `GET /api/dashboard` and the BMI calculator.

use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::Deserialize;

use super::today;
use crate::api::error::ApiError;
use crate::api::types::{ActorContext, ApiContext};
use crate::dashboard;

pub async fn overview(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<dashboard::DashboardData>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(dashboard::dashboard(&conn, &actor.user_id, today())?))
}

#[derive(Deserialize)]
pub struct BmiQuery {
    pub height_cm: u32,
    pub weight_kg: f64,
}

/// `GET /api/dashboard/bmi?height_cm=...&weight_kg=...`
pub async fn bmi(
    Query(query): Query<BmiQuery>,
) -> Result<Json<dashboard::BmiResult>, ApiError> {
    dashboard::calculate_bmi(query.height_cm, query.weight_kg)
        .map(Json)
        .ok_or_else(|| ApiError::BadRequest("height and weight must be positive".into()))
}
