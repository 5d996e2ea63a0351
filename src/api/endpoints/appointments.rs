//! Appointment endpoints: lifecycle, artifact attachments, the calendar
//! feed, and appointment type management.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use chrono::{NaiveDateTime, NaiveDate};
use serde::Deserialize;
use uuid::Uuid;

use super::{now, today};
use crate::api::error::ApiError;
use crate::api::types::{ActorContext, ApiContext};
use crate::appointments;
use crate::db::repository::{self, AppointmentFilter};
use crate::models::enums::AppointmentStatus;
use crate::models::{Appointment, AppointmentType, FollowUp, LabOrder, Prescription};

#[derive(Deserialize)]
pub struct AppointmentListQuery {
    pub provider_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub type_id: Option<Uuid>,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
    pub q: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// `GET /api/appointments`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Vec<appointments::AppointmentListItem>>, ApiError> {
    let defaults = AppointmentFilter::default();
    let filter = AppointmentFilter {
        provider_id: query.provider_id,
        patient_id: query.patient_id,
        status: query.status,
        appointment_type_id: query.type_id,
        from: query.from,
        to: query.to,
        query: query.q,
        limit: query.limit.unwrap_or(defaults.limit),
        offset: query.offset.unwrap_or(0),
    };
    let conn = ctx.state.lock_db()?;
    Ok(Json(appointments::list_appointments(&conn, &filter, now())?))
}

/// `POST /api/appointments`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<ActorContext>,
    Json(input): Json<appointments::AppointmentInput>,
) -> Result<Json<Appointment>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(appointments::create_appointment(
        &conn,
        &input,
        &actor.user_id,
        now(),
    )?))
}

/// `GET /api/appointments/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<appointments::AppointmentDetail>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(appointments::appointment_detail(&conn, &id)?))
}

/// `PUT /api/appointments/:id`
pub async fn edit(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<appointments::AppointmentInput>,
) -> Result<Json<Appointment>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(appointments::edit_appointment(&conn, &id, &input, now())?))
}

#[derive(Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

/// `POST /api/appointments/:id/status` — the status arrives as a raw
/// string so an unknown value surfaces a 400 with the row unchanged.
pub async fn update_status(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<Appointment>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(appointments::update_status(&conn, &id, &req.status, now())?))
}

/// `POST /api/appointments/:id/prescriptions`
pub async fn add_prescription(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<appointments::PrescriptionInput>,
) -> Result<Json<Prescription>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(appointments::attach_prescription(
        &conn,
        &id,
        &input,
        &actor.user_id,
        today(),
    )?))
}

/// `POST /api/appointments/:id/lab-orders`
pub async fn add_lab_order(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<appointments::LabOrderInput>,
) -> Result<Json<LabOrder>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(appointments::attach_lab_order(
        &conn,
        &id,
        &input,
        &actor.user_id,
        today(),
    )?))
}

/// `POST /api/appointments/:id/follow-ups`
pub async fn add_follow_up(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<appointments::FollowUpInput>,
) -> Result<Json<FollowUp>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(appointments::attach_follow_up(&conn, &id, &input)?))
}

/// `POST /api/follow-ups/:id/schedule`
pub async fn schedule_follow_up(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<appointments::ScheduleFollowUpInput>,
) -> Result<Json<Appointment>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(appointments::schedule_follow_up(
        &conn,
        &id,
        &input,
        &actor.user_id,
        now(),
    )?))
}

#[derive(Deserialize)]
pub struct CalendarQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// `GET /api/appointments/calendar?from=...&to=...` — events for the
/// calendar widget. Both bounds are optional; `to` is exclusive.
pub async fn calendar(
    State(ctx): State<ApiContext>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Vec<appointments::CalendarEvent>>, ApiError> {
    let from = query.from.and_then(|d| d.and_hms_opt(0, 0, 0));
    let to = query.to.and_then(|d| d.and_hms_opt(0, 0, 0));
    let conn = ctx.state.lock_db()?;
    Ok(Json(appointments::calendar_events(&conn, from, to)?))
}

// ── Appointment type management ────────────────────────────

#[derive(Deserialize)]
pub struct TypeListQuery {
    pub include_inactive: Option<bool>,
}

/// `GET /api/appointment-types`
pub async fn list_types(
    State(ctx): State<ApiContext>,
    Query(query): Query<TypeListQuery>,
) -> Result<Json<Vec<AppointmentType>>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(repository::list_appointment_types(
        &conn,
        query.include_inactive.unwrap_or(false),
    )?))
}

/// `POST /api/appointment-types`
pub async fn create_type(
    State(ctx): State<ApiContext>,
    Json(input): Json<appointments::AppointmentTypeInput>,
) -> Result<Json<AppointmentType>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(appointments::create_appointment_type(&conn, &input)?))
}

/// `PUT /api/appointment-types/:id`
pub async fn edit_type(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<appointments::AppointmentTypeInput>,
) -> Result<Json<AppointmentType>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(appointments::edit_appointment_type(&conn, &id, &input)?))
}

/// `POST /api/appointment-types/:id/toggle`
pub async fn toggle_type(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = ctx.state.lock_db()?;
    let active = repository::toggle_appointment_type_active(&conn, &id).map_err(|e| match e {
        crate::db::DatabaseError::NotFound { .. } => ApiError::NotFound(e.to_string()),
        other => ApiError::Internal(other.to_string()),
    })?;
    Ok(Json(serde_json::json!({ "is_active": active })))
}
