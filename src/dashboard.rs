//! Read-only dashboard aggregation, computed fresh per request.

use chrono::{Duration, NaiveDate};
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::appointments::AppointmentListItem;
use crate::db::repository::{self, AppointmentFilter};
use crate::db::DatabaseError;
use crate::patients::PatientRef;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardData {
    pub today: Vec<AppointmentListItem>,
    pub tomorrow: Vec<AppointmentListItem>,
    pub today_count: i64,
    pub tomorrow_count: i64,
    pub upcoming_week_count: i64,
    pub active_patient_count: i64,
    pub recent_patients: Vec<PatientRef>,
    pub favorite_patients: Vec<PatientRef>,
}

fn day_appointments(
    conn: &Connection,
    day: NaiveDate,
) -> Result<Vec<AppointmentListItem>, DatabaseError> {
    let from = day.and_hms_opt(0, 0, 0).unwrap_or_default();
    let to = from + Duration::days(1);
    let filter = AppointmentFilter {
        from: Some(from),
        to: Some(to),
        limit: u32::MAX,
        ..Default::default()
    };
    let summaries = repository::list_appointments(conn, &filter)?;
    Ok(summaries
        .into_iter()
        .map(|s| AppointmentListItem {
            is_past: false,
            appointment: s.appointment,
            patient_name: s.patient_name,
            type_name: s.type_name,
        })
        .collect())
}

pub fn dashboard(
    conn: &Connection,
    actor: &Uuid,
    today: NaiveDate,
) -> Result<DashboardData, DatabaseError> {
    let start_of_today = today.and_hms_opt(0, 0, 0).unwrap_or_default();
    let tomorrow = today + Duration::days(1);

    let today_list = day_appointments(conn, today)?;
    let tomorrow_list = day_appointments(conn, tomorrow)?;
    let upcoming_week_count = repository::count_appointments_between(
        conn,
        start_of_today,
        start_of_today + Duration::days(7),
    )?;

    let recent = crate::patients::recent_patients(conn, actor).map_err(flatten)?;
    let favorites = crate::patients::favorite_patients(conn, actor).map_err(flatten)?;

    Ok(DashboardData {
        today_count: today_list.len() as i64,
        tomorrow_count: tomorrow_list.len() as i64,
        today: today_list,
        tomorrow: tomorrow_list,
        upcoming_week_count,
        active_patient_count: repository::count_patients(conn, Some(true))?,
        recent_patients: recent,
        favorite_patients: favorites,
    })
}

fn flatten(e: crate::patients::PatientError) -> DatabaseError {
    match e {
        crate::patients::PatientError::Database(db) => db,
        other => DatabaseError::ConstraintViolation(other.to_string()),
    }
}

// ═══════════════════════════════════════════
// BMI calculator
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct BmiResult {
    pub bmi: f64,
    pub category: &'static str,
}

/// Standard WHO cutoffs; bounds are inclusive on the lower edge.
pub fn bmi_category(bmi: f64) -> &'static str {
    if bmi < 18.5 {
        "underweight"
    } else if bmi < 25.0 {
        "normal"
    } else if bmi < 30.0 {
        "overweight"
    } else {
        "obese"
    }
}

pub fn calculate_bmi(height_cm: u32, weight_kg: f64) -> Option<BmiResult> {
    let bmi = crate::models::patient::bmi_from(Some(height_cm), Some(weight_kg))?;
    Some(BmiResult {
        bmi,
        category: bmi_category(bmi),
    })
}
