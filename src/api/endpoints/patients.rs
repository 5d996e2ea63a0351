//! Patient record endpoints: list/create/detail/edit, status and
//! favorite toggles, bulk actions, and one add-endpoint per satellite
//! record type.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use super::{now, today};
use crate::api::error::ApiError;
use crate::api::types::{ActorContext, ApiContext};
use crate::db::repository::PatientFilter;
use crate::models::enums::BulkAction;
use crate::models::{
    Allergy, ChronicCondition, FamilyHistory, Immunization, MedicalHistory, Medication, Patient,
    PatientNote, VitalSigns,
};
use crate::patients;

#[derive(Deserialize)]
pub struct PatientListQuery {
    pub q: Option<String>,
    pub include_inactive: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// `GET /api/patients`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<PatientListQuery>,
) -> Result<Json<patients::PatientListData>, ApiError> {
    let defaults = PatientFilter::default();
    let filter = PatientFilter {
        query: query.q,
        is_active: if query.include_inactive.unwrap_or(false) {
            None
        } else {
            Some(true)
        },
        limit: query.limit.unwrap_or(defaults.limit),
        offset: query.offset.unwrap_or(0),
    };
    let conn = ctx.state.lock_db()?;
    Ok(Json(patients::list_patients(&conn, &filter, today())?))
}

/// `POST /api/patients`
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(input): Json<patients::PatientInput>,
) -> Result<Json<patients::PatientCreated>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(patients::create_patient(&conn, &input, now())?))
}

/// `GET /api/patients/:id` — also refreshes the viewer's recency marker.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<patients::PatientDetail>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(patients::patient_detail(&conn, &id, &actor.user_id, now())?))
}

/// `PUT /api/patients/:id`
pub async fn edit(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<patients::PatientInput>,
) -> Result<Json<Patient>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(patients::edit_patient(&conn, &id, &input, now())?))
}

/// `POST /api/patients/:id/toggle-status`
pub async fn toggle_status(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = ctx.state.lock_db()?;
    let active = patients::toggle_active(&conn, &id, now())?;
    Ok(Json(serde_json::json!({ "is_active": active })))
}

/// `POST /api/patients/:id/toggle-favorite`
pub async fn toggle_favorite(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = ctx.state.lock_db()?;
    let favorited = patients::toggle_favorite(&conn, &actor.user_id, &id, now())?;
    Ok(Json(serde_json::json!({ "is_favorite": favorited })))
}

#[derive(Deserialize)]
pub struct BulkActionRequest {
    pub action: BulkAction,
    pub patient_ids: Vec<Uuid>,
}

/// `POST /api/patients/bulk-action`
pub async fn bulk_action(
    State(ctx): State<ApiContext>,
    Json(req): Json<BulkActionRequest>,
) -> Result<Json<patients::BulkOutcome>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(patients::bulk_action(
        &conn,
        req.action,
        &req.patient_ids,
        now(),
    )?))
}

/// `GET /api/patients/recent` — the caller's five most recently viewed.
pub async fn recent(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<Vec<patients::PatientRef>>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(patients::recent_patients(&conn, &actor.user_id)?))
}

/// `GET /api/patients/favorites`
pub async fn favorites(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<Vec<patients::PatientRef>>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(patients::favorite_patients(&conn, &actor.user_id)?))
}

// ── Satellite record creation ──────────────────────────────

/// `POST /api/patients/:id/allergies`
pub async fn add_allergy(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<patients::AllergyInput>,
) -> Result<Json<Allergy>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(patients::add_allergy(&conn, &id, &input)?))
}

/// `POST /api/patients/:id/conditions`
pub async fn add_condition(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<patients::ConditionInput>,
) -> Result<Json<ChronicCondition>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(patients::add_condition(&conn, &id, &input)?))
}

/// `POST /api/patients/:id/medications`
pub async fn add_medication(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<patients::MedicationInput>,
) -> Result<Json<Medication>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(patients::add_medication(&conn, &id, &input)?))
}

/// `POST /api/patients/:id/medical-history`
pub async fn add_medical_history(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<patients::MedicalHistoryInput>,
) -> Result<Json<MedicalHistory>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(patients::add_medical_history(&conn, &id, &input)?))
}

/// `POST /api/patients/:id/family-history`
pub async fn add_family_history(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<patients::FamilyHistoryInput>,
) -> Result<Json<FamilyHistory>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(patients::add_family_history(&conn, &id, &input)?))
}

/// `POST /api/patients/:id/immunizations`
pub async fn add_immunization(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<patients::ImmunizationInput>,
) -> Result<Json<Immunization>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(patients::add_immunization(&conn, &id, &input)?))
}

/// `POST /api/patients/:id/vitals`
pub async fn add_vitals(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<patients::VitalSignsInput>,
) -> Result<Json<VitalSigns>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(patients::add_vital_signs(
        &conn,
        &id,
        &input,
        &actor.user_id,
        now(),
    )?))
}

/// `POST /api/patients/:id/notes`
pub async fn add_note(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<patients::NoteInput>,
) -> Result<Json<PatientNote>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(patients::add_note(&conn, &id, &input, &actor.user_id, now())?))
}
