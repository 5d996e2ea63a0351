//! Appointment lifecycle service: create/edit/status transitions plus the
//! three clinical artifact attachments and follow-up scheduling.

use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::repository::{self, AppointmentFilter};
use crate::db::DatabaseError;
use crate::models::enums::{AppointmentStatus, FollowUpPriority, Frequency, LabOrderStatus};
use crate::models::{
    Appointment, AppointmentType, FollowUp, LabOrder, Medication, Prescription,
};

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("{0}")]
    Validation(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl ScheduleError {
    fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

// ═══════════════════════════════════════════
// Inputs
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentInput {
    pub patient_id: Uuid,
    pub appointment_type_id: Uuid,
    pub provider_id: Uuid,
    pub start_time: NaiveDateTime,
    pub reason: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrescriptionInput {
    pub medication_name: String,
    pub dosage: String,
    pub frequency: Frequency,
    pub duration_days: u32,
    pub refills: u32,
    pub instructions: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabOrderInput {
    pub lab_name: String,
    pub description: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FollowUpInput {
    pub recommended_time_frame: String,
    pub reason: String,
    pub priority: FollowUpPriority,
    pub notes: Option<String>,
}

/// Fields for the appointment created out of a follow-up. Patient and
/// reason fall back to the follow-up's own values when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleFollowUpInput {
    pub appointment_type_id: Uuid,
    pub provider_id: Uuid,
    pub start_time: NaiveDateTime,
    pub patient_id: Option<Uuid>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

// ═══════════════════════════════════════════
// Core operations
// ═══════════════════════════════════════════

fn active_type(conn: &Connection, id: &Uuid) -> Result<AppointmentType, ScheduleError> {
    let appointment_type = repository::get_appointment_type(conn, id)?
        .ok_or_else(|| ScheduleError::not_found("AppointmentType", id))?;
    if !appointment_type.is_active {
        return Err(ScheduleError::Validation(format!(
            "appointment type '{}' is inactive",
            appointment_type.name
        )));
    }
    Ok(appointment_type)
}

fn validate_references(
    conn: &Connection,
    input: &AppointmentInput,
) -> Result<AppointmentType, ScheduleError> {
    let appointment_type = active_type(conn, &input.appointment_type_id)?;

    let provider = repository::get_user(conn, &input.provider_id)?
        .ok_or_else(|| ScheduleError::not_found("Provider", input.provider_id))?;
    if !provider.is_active {
        return Err(ScheduleError::Validation(format!(
            "provider '{}' is inactive",
            provider.full_name()
        )));
    }

    let patient = repository::get_patient(conn, &input.patient_id)?
        .ok_or_else(|| ScheduleError::not_found("Patient", input.patient_id))?;
    if !patient.is_active {
        return Err(ScheduleError::Validation(format!(
            "patient '{}' is inactive",
            patient.full_name()
        )));
    }

    Ok(appointment_type)
}

/// end_time is always derived from the type's duration, even when zero.
fn end_time(start: NaiveDateTime, appointment_type: &AppointmentType) -> NaiveDateTime {
    start + Duration::minutes(appointment_type.duration_minutes as i64)
}

pub fn create_appointment(
    conn: &Connection,
    input: &AppointmentInput,
    actor: &Uuid,
    now: NaiveDateTime,
) -> Result<Appointment, ScheduleError> {
    let appointment_type = validate_references(conn, input)?;
    let appointment = Appointment {
        id: Uuid::new_v4(),
        patient_id: input.patient_id,
        appointment_type_id: input.appointment_type_id,
        provider_id: input.provider_id,
        start_time: input.start_time,
        end_time: end_time(input.start_time, &appointment_type),
        status: AppointmentStatus::Scheduled,
        reason: input.reason.clone(),
        notes: input.notes.clone(),
        created_by: *actor,
        created_at: now,
        updated_at: now,
    };
    repository::insert_appointment(conn, &appointment)?;
    tracing::info!(appointment_id = %appointment.id, patient_id = %appointment.patient_id,
        "appointment created");
    Ok(appointment)
}

/// Same reference validation and end-time recomputation as create. The
/// current status is left alone; no transition check happens here.
pub fn edit_appointment(
    conn: &Connection,
    id: &Uuid,
    input: &AppointmentInput,
    now: NaiveDateTime,
) -> Result<Appointment, ScheduleError> {
    let existing = repository::get_appointment(conn, id)?
        .ok_or_else(|| ScheduleError::not_found("Appointment", id))?;
    let appointment_type = validate_references(conn, input)?;
    let appointment = Appointment {
        patient_id: input.patient_id,
        appointment_type_id: input.appointment_type_id,
        provider_id: input.provider_id,
        start_time: input.start_time,
        end_time: end_time(input.start_time, &appointment_type),
        reason: input.reason.clone(),
        notes: input.notes.clone(),
        updated_at: now,
        ..existing
    };
    repository::update_appointment(conn, &appointment)?;
    Ok(appointment)
}

/// Any-to-any transitions are allowed; only the status string itself is
/// validated. An unknown value leaves the row untouched.
pub fn update_status(
    conn: &Connection,
    id: &Uuid,
    status: &str,
    now: NaiveDateTime,
) -> Result<Appointment, ScheduleError> {
    let status = AppointmentStatus::from_str(status)
        .map_err(|_| ScheduleError::Validation(format!("invalid appointment status '{status}'")))?;
    let mut appointment = repository::get_appointment(conn, id)?
        .ok_or_else(|| ScheduleError::not_found("Appointment", id))?;
    repository::set_appointment_status(conn, id, status, now)?;
    appointment.status = status;
    appointment.updated_at = now;
    Ok(appointment)
}

/// Writes the prescription and its mirrored patient medication in one
/// transaction; neither row exists without the other.
pub fn attach_prescription(
    conn: &Connection,
    appointment_id: &Uuid,
    input: &PrescriptionInput,
    actor: &Uuid,
    today: NaiveDate,
) -> Result<Prescription, ScheduleError> {
    let appointment = repository::get_appointment(conn, appointment_id)?
        .ok_or_else(|| ScheduleError::not_found("Appointment", appointment_id))?;
    let prescriber = repository::get_user(conn, actor)?
        .ok_or_else(|| ScheduleError::not_found("User", actor))?;

    let prescription = Prescription {
        id: Uuid::new_v4(),
        appointment_id: *appointment_id,
        medication_name: input.medication_name.clone(),
        dosage: input.dosage.clone(),
        frequency: input.frequency,
        duration_days: input.duration_days,
        refills: input.refills,
        instructions: input.instructions.clone(),
        notes: input.notes.clone(),
        prescribed_by: *actor,
        date_prescribed: today,
    };
    let medication = Medication {
        id: Uuid::new_v4(),
        patient_id: appointment.patient_id,
        medication_name: input.medication_name.clone(),
        dosage: input.dosage.clone(),
        frequency: input.frequency,
        start_date: today,
        end_date: (input.duration_days > 0)
            .then(|| today + Duration::days(input.duration_days as i64)),
        prescribing_doctor: prescriber.full_name(),
        reason: Some(input.instructions.clone()),
        notes: input.notes.clone(),
        is_active: true,
    };

    let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;
    repository::insert_prescription(&tx, &prescription)?;
    repository::insert_medication(&tx, &medication)?;
    tx.commit().map_err(DatabaseError::from)?;
    tracing::info!(appointment_id = %appointment_id, medication = %input.medication_name,
        "prescription attached and mirrored");
    Ok(prescription)
}

pub fn attach_lab_order(
    conn: &Connection,
    appointment_id: &Uuid,
    input: &LabOrderInput,
    actor: &Uuid,
    today: NaiveDate,
) -> Result<LabOrder, ScheduleError> {
    repository::get_appointment(conn, appointment_id)?
        .ok_or_else(|| ScheduleError::not_found("Appointment", appointment_id))?;
    let order = LabOrder {
        id: Uuid::new_v4(),
        appointment_id: *appointment_id,
        lab_name: input.lab_name.clone(),
        description: input.description.clone(),
        status: LabOrderStatus::Ordered,
        ordered_by: *actor,
        ordered_date: today,
        results_date: None,
        results: None,
        notes: input.notes.clone(),
    };
    repository::insert_lab_order(conn, &order)?;
    Ok(order)
}

pub fn attach_follow_up(
    conn: &Connection,
    appointment_id: &Uuid,
    input: &FollowUpInput,
) -> Result<FollowUp, ScheduleError> {
    repository::get_appointment(conn, appointment_id)?
        .ok_or_else(|| ScheduleError::not_found("Appointment", appointment_id))?;
    let follow_up = FollowUp {
        id: Uuid::new_v4(),
        appointment_id: *appointment_id,
        recommended_time_frame: input.recommended_time_frame.clone(),
        reason: input.reason.clone(),
        priority: input.priority,
        notes: input.notes.clone(),
        is_scheduled: false,
        follow_up_appointment_id: None,
    };
    repository::insert_follow_up(conn, &follow_up)?;
    Ok(follow_up)
}

/// Creates the appointment and marks the follow-up scheduled in one
/// transaction. Patient and reason default to the follow-up's own.
pub fn schedule_follow_up(
    conn: &Connection,
    follow_up_id: &Uuid,
    input: &ScheduleFollowUpInput,
    actor: &Uuid,
    now: NaiveDateTime,
) -> Result<Appointment, ScheduleError> {
    let follow_up = repository::get_follow_up(conn, follow_up_id)?
        .ok_or_else(|| ScheduleError::not_found("FollowUp", follow_up_id))?;
    if follow_up.is_scheduled {
        return Err(ScheduleError::Validation(
            "follow-up is already scheduled".into(),
        ));
    }
    let source = repository::get_appointment(conn, &follow_up.appointment_id)?
        .ok_or_else(|| ScheduleError::not_found("Appointment", follow_up.appointment_id))?;

    let appointment_input = AppointmentInput {
        patient_id: input.patient_id.unwrap_or(source.patient_id),
        appointment_type_id: input.appointment_type_id,
        provider_id: input.provider_id,
        start_time: input.start_time,
        reason: input.reason.clone().unwrap_or_else(|| follow_up.reason.clone()),
        notes: input.notes.clone(),
    };

    let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;
    let appointment = create_appointment(&tx, &appointment_input, actor, now)?;
    repository::mark_follow_up_scheduled(&tx, follow_up_id, &appointment.id)?;
    tx.commit().map_err(DatabaseError::from)?;
    tracing::info!(follow_up_id = %follow_up_id, appointment_id = %appointment.id,
        "follow-up scheduled");
    Ok(appointment)
}

// ═══════════════════════════════════════════
// Read side: detail, list, calendar feed
// ═══════════════════════════════════════════

/// Appointment detail with names and every attached artifact.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDetail {
    pub appointment: Appointment,
    pub patient_name: String,
    pub provider_name: String,
    pub type_name: String,
    pub prescriptions: Vec<Prescription>,
    pub lab_orders: Vec<LabOrder>,
    pub follow_ups: Vec<FollowUp>,
}

pub fn appointment_detail(
    conn: &Connection,
    id: &Uuid,
) -> Result<AppointmentDetail, ScheduleError> {
    let appointment = repository::get_appointment(conn, id)?
        .ok_or_else(|| ScheduleError::not_found("Appointment", id))?;
    let patient = repository::get_patient(conn, &appointment.patient_id)?
        .ok_or_else(|| ScheduleError::not_found("Patient", appointment.patient_id))?;
    let provider = repository::get_user(conn, &appointment.provider_id)?
        .ok_or_else(|| ScheduleError::not_found("Provider", appointment.provider_id))?;
    let appointment_type = repository::get_appointment_type(conn, &appointment.appointment_type_id)?
        .ok_or_else(|| ScheduleError::not_found("AppointmentType", appointment.appointment_type_id))?;
    Ok(AppointmentDetail {
        prescriptions: repository::list_prescriptions(conn, id)?,
        lab_orders: repository::list_lab_orders(conn, id)?,
        follow_ups: repository::list_follow_ups(conn, id)?,
        appointment,
        patient_name: patient.full_name(),
        provider_name: provider.full_name(),
        type_name: appointment_type.name,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentListItem {
    pub appointment: Appointment,
    pub patient_name: String,
    pub type_name: String,
    pub is_past: bool,
}

pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
    now: NaiveDateTime,
) -> Result<Vec<AppointmentListItem>, ScheduleError> {
    let summaries = repository::list_appointments(conn, filter)?;
    Ok(summaries
        .into_iter()
        .map(|s| AppointmentListItem {
            is_past: s.appointment.is_past(now),
            appointment: s.appointment,
            patient_name: s.patient_name,
            type_name: s.type_name,
        })
        .collect())
}

/// Event payload for the calendar feed.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub title: String,
    pub start: String,
    pub end: String,
    pub color: String,
    pub url: String,
}

/// Fixed per-status event colors.
pub fn status_color(status: AppointmentStatus) -> &'static str {
    match status {
        AppointmentStatus::Scheduled => "#305F6D",
        AppointmentStatus::Confirmed => "#698C8E",
        AppointmentStatus::InProgress => "#BF6E15",
        AppointmentStatus::Completed => "#C1884E",
        AppointmentStatus::Cancelled | AppointmentStatus::NoShow => "#263037",
    }
}

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Either bound may be absent; an open side places no limit on that end.
pub fn calendar_events(
    conn: &Connection,
    from: Option<NaiveDateTime>,
    to: Option<NaiveDateTime>,
) -> Result<Vec<CalendarEvent>, ScheduleError> {
    let filter = AppointmentFilter {
        from,
        to,
        limit: u32::MAX,
        ..Default::default()
    };
    let summaries = repository::list_appointments(conn, &filter)?;
    Ok(summaries
        .into_iter()
        .map(|s| CalendarEvent {
            id: s.appointment.id,
            title: format!("{} - {}", s.patient_name, s.type_name),
            start: s.appointment.start_time.format(ISO_FORMAT).to_string(),
            end: s.appointment.end_time.format(ISO_FORMAT).to_string(),
            color: status_color(s.appointment.status).to_string(),
            url: format!("/appointments/{}/", s.appointment.id),
        })
        .collect())
}

// ═══════════════════════════════════════════
// Appointment type management
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentTypeInput {
    pub name: String,
    pub duration_minutes: u32,
    pub description: Option<String>,
    pub default_notes: Option<String>,
    pub color_code: Option<String>,
}

const DEFAULT_TYPE_COLOR: &str = "#305F6D";

pub fn create_appointment_type(
    conn: &Connection,
    input: &AppointmentTypeInput,
) -> Result<AppointmentType, ScheduleError> {
    if input.name.trim().is_empty() {
        return Err(ScheduleError::Validation("name must not be empty".into()));
    }
    let appointment_type = AppointmentType {
        id: Uuid::new_v4(),
        name: input.name.clone(),
        duration_minutes: input.duration_minutes,
        description: input.description.clone(),
        default_notes: input.default_notes.clone(),
        color_code: input
            .color_code
            .clone()
            .unwrap_or_else(|| DEFAULT_TYPE_COLOR.to_string()),
        is_active: true,
    };
    repository::insert_appointment_type(conn, &appointment_type)?;
    Ok(appointment_type)
}

pub fn edit_appointment_type(
    conn: &Connection,
    id: &Uuid,
    input: &AppointmentTypeInput,
) -> Result<AppointmentType, ScheduleError> {
    let existing = repository::get_appointment_type(conn, id)?
        .ok_or_else(|| ScheduleError::not_found("AppointmentType", id))?;
    let appointment_type = AppointmentType {
        name: input.name.clone(),
        duration_minutes: input.duration_minutes,
        description: input.description.clone(),
        default_notes: input.default_notes.clone(),
        color_code: input.color_code.clone().unwrap_or(existing.color_code),
        ..existing
    };
    repository::update_appointment_type(conn, &appointment_type)?;
    Ok(appointment_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::models::enums::{BloodType, Gender, Role};
    use crate::models::{Patient, User};

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn seed_user(conn: &Connection, role: Role) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: format!("{}@clinic.test", Uuid::new_v4()),
            first_name: "Dana".into(),
            last_name: "Reyes".into(),
            role,
            phone_number: None,
            password_hash: "x".into(),
            is_active: true,
            use_dark_theme: false,
            date_joined: dt(2024, 1, 1, 8, 0),
            last_login: None,
        };
        repository::insert_user(conn, &user).unwrap();
        user
    }

    fn seed_patient(conn: &Connection) -> Patient {
        let now = dt(2024, 1, 1, 8, 0);
        let patient = Patient {
            id: Uuid::new_v4(),
            medical_record_number: Uuid::new_v4().to_string(),
            first_name: "Avery".into(),
            last_name: "Lund".into(),
            preferred_name: None,
            date_of_birth: NaiveDate::from_ymd_opt(1985, 4, 2).unwrap(),
            gender: Gender::Female,
            email: None,
            phone_primary: "555-0100".into(),
            phone_emergency: None,
            address: "1 Main St".into(),
            emergency_contact_name: "Kin".into(),
            emergency_contact_relation: "spouse".into(),
            emergency_contact_phone: "555-0101".into(),
            insurance_provider: None,
            insurance_member_id: None,
            blood_type: BloodType::OPositive,
            height_cm: None,
            weight_kg: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        repository::insert_patient(conn, &patient).unwrap();
        patient
    }

    fn seed_type(conn: &Connection, duration: u32) -> AppointmentType {
        create_appointment_type(
            conn,
            &AppointmentTypeInput {
                name: "Consultation".into(),
                duration_minutes: duration,
                description: None,
                default_notes: None,
                color_code: None,
            },
        )
        .unwrap()
    }

    struct Fixture {
        conn: Connection,
        patient: Patient,
        provider: User,
        appointment_type: AppointmentType,
    }

    fn fixture(duration: u32) -> Fixture {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);
        let provider = seed_user(&conn, Role::Doctor);
        let appointment_type = seed_type(&conn, duration);
        Fixture {
            conn,
            patient,
            provider,
            appointment_type,
        }
    }

    fn input(f: &Fixture, start: NaiveDateTime) -> AppointmentInput {
        AppointmentInput {
            patient_id: f.patient.id,
            appointment_type_id: f.appointment_type.id,
            provider_id: f.provider.id,
            start_time: start,
            reason: "annual checkup".into(),
            notes: None,
        }
    }

    #[test]
    fn end_time_is_start_plus_type_duration() {
        let f = fixture(45);
        let start = dt(2024, 3, 4, 9, 0);
        let appt =
            create_appointment(&f.conn, &input(&f, start), &f.provider.id, start).unwrap();
        assert_eq!(appt.end_time, dt(2024, 3, 4, 9, 45));
        assert_eq!(appt.status, AppointmentStatus::Scheduled);
    }

    #[test]
    fn zero_duration_type_gives_equal_start_and_end() {
        let f = fixture(0);
        let start = dt(2024, 3, 4, 9, 0);
        let appt =
            create_appointment(&f.conn, &input(&f, start), &f.provider.id, start).unwrap();
        assert_eq!(appt.end_time, appt.start_time);
    }

    #[test]
    fn inactive_type_is_rejected() {
        let f = fixture(30);
        repository::toggle_appointment_type_active(&f.conn, &f.appointment_type.id).unwrap();
        let start = dt(2024, 3, 4, 9, 0);
        let err =
            create_appointment(&f.conn, &input(&f, start), &f.provider.id, start).unwrap_err();
        assert!(matches!(err, ScheduleError::Validation(_)));
    }

    #[test]
    fn overlapping_appointments_are_allowed() {
        let f = fixture(30);
        let start = dt(2024, 3, 4, 9, 0);
        create_appointment(&f.conn, &input(&f, start), &f.provider.id, start).unwrap();
        // Same provider, same slot: accepted.
        assert!(create_appointment(&f.conn, &input(&f, start), &f.provider.id, start).is_ok());
    }

    #[test]
    fn edit_recomputes_end_time_from_new_start() {
        let f = fixture(30);
        let start = dt(2024, 3, 4, 9, 0);
        let appt =
            create_appointment(&f.conn, &input(&f, start), &f.provider.id, start).unwrap();
        let moved = dt(2024, 3, 5, 14, 0);
        let edited =
            edit_appointment(&f.conn, &appt.id, &input(&f, moved), moved).unwrap();
        assert_eq!(edited.end_time, dt(2024, 3, 5, 14, 30));
    }

    #[test]
    fn status_accepts_all_six_values_in_any_order() {
        let f = fixture(30);
        let start = dt(2024, 3, 4, 9, 0);
        let appt =
            create_appointment(&f.conn, &input(&f, start), &f.provider.id, start).unwrap();
        for s in [
            "completed",
            "scheduled",
            "no_show",
            "in_progress",
            "confirmed",
            "cancelled",
        ] {
            let updated = update_status(&f.conn, &appt.id, s, start).unwrap();
            assert_eq!(updated.status.as_str(), s);
        }
    }

    #[test]
    fn invalid_status_leaves_row_unchanged() {
        let f = fixture(30);
        let start = dt(2024, 3, 4, 9, 0);
        let appt =
            create_appointment(&f.conn, &input(&f, start), &f.provider.id, start).unwrap();
        update_status(&f.conn, &appt.id, "confirmed", start).unwrap();
        let err = update_status(&f.conn, &appt.id, "booked", start).unwrap_err();
        assert!(matches!(err, ScheduleError::Validation(_)));
        let current = repository::get_appointment(&f.conn, &appt.id).unwrap().unwrap();
        assert_eq!(current.status, AppointmentStatus::Confirmed);
    }

    #[test]
    fn prescription_mirrors_a_patient_medication() {
        let f = fixture(30);
        let start = dt(2024, 3, 4, 9, 0);
        let appt =
            create_appointment(&f.conn, &input(&f, start), &f.provider.id, start).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        attach_prescription(
            &f.conn,
            &appt.id,
            &PrescriptionInput {
                medication_name: "Amoxicillin".into(),
                dosage: "500mg".into(),
                frequency: Frequency::ThreeTimesDaily,
                duration_days: 30,
                refills: 0,
                instructions: "with food".into(),
                notes: None,
            },
            &f.provider.id,
            today,
        )
        .unwrap();

        let meds = repository::list_medications(&f.conn, &f.patient.id).unwrap();
        assert_eq!(meds.len(), 1);
        assert_eq!(meds[0].start_date, today);
        assert_eq!(
            meds[0].end_date,
            Some(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())
        );
        assert!(meds[0].is_active);
        assert_eq!(meds[0].reason.as_deref(), Some("with food"));
        assert_eq!(meds[0].prescribing_doctor, f.provider.full_name());
    }

    #[test]
    fn zero_duration_prescription_has_open_ended_medication() {
        let f = fixture(30);
        let start = dt(2024, 3, 4, 9, 0);
        let appt =
            create_appointment(&f.conn, &input(&f, start), &f.provider.id, start).unwrap();
        attach_prescription(
            &f.conn,
            &appt.id,
            &PrescriptionInput {
                medication_name: "Lisinopril".into(),
                dosage: "10mg".into(),
                frequency: Frequency::OnceDaily,
                duration_days: 0,
                refills: 3,
                instructions: "ongoing".into(),
                notes: None,
            },
            &f.provider.id,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
        .unwrap();
        let meds = repository::list_medications(&f.conn, &f.patient.id).unwrap();
        assert_eq!(meds[0].end_date, None);
    }

    #[test]
    fn schedule_follow_up_links_back_and_defaults_reason() {
        let f = fixture(30);
        let start = dt(2024, 3, 4, 9, 0);
        let appt =
            create_appointment(&f.conn, &input(&f, start), &f.provider.id, start).unwrap();
        let follow_up = attach_follow_up(
            &f.conn,
            &appt.id,
            &FollowUpInput {
                recommended_time_frame: "2 weeks".into(),
                reason: "review bloodwork".into(),
                priority: FollowUpPriority::High,
                notes: None,
            },
        )
        .unwrap();

        let next_start = dt(2024, 3, 18, 9, 0);
        let created = schedule_follow_up(
            &f.conn,
            &follow_up.id,
            &ScheduleFollowUpInput {
                appointment_type_id: f.appointment_type.id,
                provider_id: f.provider.id,
                start_time: next_start,
                patient_id: None,
                reason: None,
                notes: None,
            },
            &f.provider.id,
            next_start,
        )
        .unwrap();

        assert_eq!(created.reason, "review bloodwork");
        assert_eq!(created.patient_id, f.patient.id);
        let updated = repository::get_follow_up(&f.conn, &follow_up.id).unwrap().unwrap();
        assert!(updated.is_scheduled);
        assert_eq!(updated.follow_up_appointment_id, Some(created.id));

        // A second scheduling attempt is refused.
        let err = schedule_follow_up(
            &f.conn,
            &follow_up.id,
            &ScheduleFollowUpInput {
                appointment_type_id: f.appointment_type.id,
                provider_id: f.provider.id,
                start_time: next_start,
                patient_id: None,
                reason: None,
                notes: None,
            },
            &f.provider.id,
            next_start,
        )
        .unwrap_err();
        assert!(matches!(err, ScheduleError::Validation(_)));
    }

    #[test]
    fn calendar_event_shape_and_colors() {
        let f = fixture(30);
        let start = dt(2024, 3, 4, 9, 0);
        let appt =
            create_appointment(&f.conn, &input(&f, start), &f.provider.id, start).unwrap();
        update_status(&f.conn, &appt.id, "in_progress", start).unwrap();

        let events = calendar_events(
            &f.conn,
            Some(dt(2024, 3, 1, 0, 0)),
            Some(dt(2024, 4, 1, 0, 0)),
        )
        .unwrap();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.title, "Avery Lund - Consultation");
        assert_eq!(event.start, "2024-03-04T09:00:00");
        assert_eq!(event.end, "2024-03-04T09:30:00");
        assert_eq!(event.color, "#BF6E15");
        assert_eq!(event.url, format!("/appointments/{}/", appt.id));
    }

    #[test]
    fn calendar_range_is_optional() {
        let f = fixture(30);
        create_appointment(&f.conn, &input(&f, dt(2024, 1, 10, 9, 0)), &f.provider.id, dt(2024, 1, 1, 8, 0))
            .unwrap();
        create_appointment(&f.conn, &input(&f, dt(2024, 6, 10, 9, 0)), &f.provider.id, dt(2024, 1, 1, 8, 0))
            .unwrap();

        let all = calendar_events(&f.conn, None, None).unwrap();
        assert_eq!(all.len(), 2);

        let from_only = calendar_events(&f.conn, Some(dt(2024, 3, 1, 0, 0)), None).unwrap();
        assert_eq!(from_only.len(), 1);
        assert_eq!(from_only[0].start, "2024-06-10T09:00:00");

        let to_only = calendar_events(&f.conn, None, Some(dt(2024, 3, 1, 0, 0))).unwrap();
        assert_eq!(to_only.len(), 1);
        assert_eq!(to_only[0].start, "2024-01-10T09:00:00");
    }

    #[test]
    fn follow_ups_list_highest_priority_first() {
        let f = fixture(30);
        let start = dt(2024, 3, 4, 9, 0);
        let appt =
            create_appointment(&f.conn, &input(&f, start), &f.provider.id, start).unwrap();
        for priority in [
            FollowUpPriority::Medium,
            FollowUpPriority::Low,
            FollowUpPriority::High,
        ] {
            attach_follow_up(
                &f.conn,
                &appt.id,
                &FollowUpInput {
                    recommended_time_frame: "2 weeks".into(),
                    reason: "review".into(),
                    priority,
                    notes: None,
                },
            )
            .unwrap();
        }
        let listed = repository::list_follow_ups(&f.conn, &appt.id).unwrap();
        let priorities: Vec<_> = listed.iter().map(|fu| fu.priority).collect();
        assert_eq!(
            priorities,
            vec![
                FollowUpPriority::High,
                FollowUpPriority::Medium,
                FollowUpPriority::Low
            ]
        );
    }

    #[test]
    fn status_update_on_unknown_appointment_is_not_found() {
        let f = fixture(30);
        let err = update_status(&f.conn, &Uuid::new_v4(), "confirmed", dt(2024, 3, 1, 9, 0))
            .unwrap_err();
        assert!(matches!(err, ScheduleError::NotFound { .. }));
    }

    #[test]
    fn cancelled_and_no_show_share_a_color() {
        assert_eq!(status_color(AppointmentStatus::Cancelled), "#263037");
        assert_eq!(status_color(AppointmentStatus::NoShow), "#263037");
        assert_eq!(status_color(AppointmentStatus::Scheduled), "#305F6D");
        assert_eq!(status_color(AppointmentStatus::Confirmed), "#698C8E");
        assert_eq!(status_color(AppointmentStatus::Completed), "#C1884E");
    }

    #[test]
    fn detail_collects_all_artifacts() {
        let f = fixture(30);
        let start = dt(2024, 3, 4, 9, 0);
        let appt =
            create_appointment(&f.conn, &input(&f, start), &f.provider.id, start).unwrap();
        attach_lab_order(
            &f.conn,
            &appt.id,
            &LabOrderInput {
                lab_name: "CBC".into(),
                description: "complete blood count".into(),
                notes: None,
            },
            &f.provider.id,
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
        )
        .unwrap();

        let detail = appointment_detail(&f.conn, &appt.id).unwrap();
        assert_eq!(detail.patient_name, "Avery Lund");
        assert_eq!(detail.lab_orders.len(), 1);
        assert_eq!(detail.lab_orders[0].status, LabOrderStatus::Ordered);
        assert!(detail.prescriptions.is_empty());
    }
}
