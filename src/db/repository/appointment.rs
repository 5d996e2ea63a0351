use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Connection};
use uuid::Uuid;

use super::{parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::AppointmentStatus;
use crate::models::{Appointment, AppointmentType};

// ── Appointment types ──────────────────────────────────────

const TYPE_COLUMNS: &str =
    "id, name, duration_minutes, description, default_notes, color_code, is_active";

pub fn insert_appointment_type(
    conn: &Connection,
    appointment_type: &AppointmentType,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointment_types (id, name, duration_minutes, description,
         default_notes, color_code, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            appointment_type.id.to_string(),
            appointment_type.name,
            appointment_type.duration_minutes,
            appointment_type.description,
            appointment_type.default_notes,
            appointment_type.color_code,
            appointment_type.is_active as i32,
        ],
    )?;
    Ok(())
}

fn type_row(row: &rusqlite::Row<'_>) -> Result<(String, String, u32, Option<String>, Option<String>, String, i32), rusqlite::Error> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn type_from_tuple(
    t: (String, String, u32, Option<String>, Option<String>, String, i32),
) -> Result<AppointmentType, DatabaseError> {
    let (id, name, duration_minutes, description, default_notes, color_code, is_active) = t;
    Ok(AppointmentType {
        id: parse_uuid(&id)?,
        name,
        duration_minutes,
        description,
        default_notes,
        color_code,
        is_active: is_active != 0,
    })
}

pub fn get_appointment_type(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<AppointmentType>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TYPE_COLUMNS} FROM appointment_types WHERE id = ?1"
    ))?;
    let result = stmt.query_row(params![id.to_string()], type_row);
    match result {
        Ok(t) => Ok(Some(type_from_tuple(t)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_appointment_types(
    conn: &Connection,
    include_inactive: bool,
) -> Result<Vec<AppointmentType>, DatabaseError> {
    let sql = if include_inactive {
        format!("SELECT {TYPE_COLUMNS} FROM appointment_types ORDER BY name")
    } else {
        format!("SELECT {TYPE_COLUMNS} FROM appointment_types WHERE is_active = 1 ORDER BY name")
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], type_row)?;
    let mut types = Vec::new();
    for row in rows {
        types.push(type_from_tuple(row?)?);
    }
    Ok(types)
}

pub fn update_appointment_type(
    conn: &Connection,
    appointment_type: &AppointmentType,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointment_types SET name = ?2, duration_minutes = ?3, description = ?4,
         default_notes = ?5, color_code = ?6, is_active = ?7
         WHERE id = ?1",
        params![
            appointment_type.id.to_string(),
            appointment_type.name,
            appointment_type.duration_minutes,
            appointment_type.description,
            appointment_type.default_notes,
            appointment_type.color_code,
            appointment_type.is_active as i32,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("AppointmentType", appointment_type.id));
    }
    Ok(())
}

/// Flip active status; returns the new value.
pub fn toggle_appointment_type_active(
    conn: &Connection,
    id: &Uuid,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointment_types SET is_active = 1 - is_active WHERE id = ?1",
        params![id.to_string()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("AppointmentType", id));
    }
    let active: i64 = conn.query_row(
        "SELECT is_active FROM appointment_types WHERE id = ?1",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    Ok(active != 0)
}

// ── Appointments ───────────────────────────────────────────

pub fn insert_appointment(
    conn: &Connection,
    appointment: &Appointment,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, patient_id, appointment_type_id, provider_id,
         start_time, end_time, status, reason, notes, created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            appointment.id.to_string(),
            appointment.patient_id.to_string(),
            appointment.appointment_type_id.to_string(),
            appointment.provider_id.to_string(),
            appointment.start_time.to_string(),
            appointment.end_time.to_string(),
            appointment.status.as_str(),
            appointment.reason,
            appointment.notes,
            appointment.created_by.to_string(),
            appointment.created_at.to_string(),
            appointment.updated_at.to_string(),
        ],
    )?;
    Ok(())
}

struct AppointmentRow {
    id: String,
    patient_id: String,
    appointment_type_id: String,
    provider_id: String,
    start_time: String,
    end_time: String,
    status: String,
    reason: String,
    notes: Option<String>,
    created_by: String,
    created_at: String,
    updated_at: String,
}

fn appointment_row(row: &rusqlite::Row<'_>) -> Result<AppointmentRow, rusqlite::Error> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        appointment_type_id: row.get(2)?,
        provider_id: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        status: row.get(6)?,
        reason: row.get(7)?,
        notes: row.get(8)?,
        created_by: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    Ok(Appointment {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        appointment_type_id: parse_uuid(&row.appointment_type_id)?,
        provider_id: parse_uuid(&row.provider_id)?,
        start_time: parse_datetime(&row.start_time)?,
        end_time: parse_datetime(&row.end_time)?,
        status: AppointmentStatus::from_str(&row.status)?,
        reason: row.reason,
        notes: row.notes,
        created_by: parse_uuid(&row.created_by)?,
        created_at: parse_datetime(&row.created_at)?,
        updated_at: parse_datetime(&row.updated_at)?,
    })
}

const APPOINTMENT_COLUMNS: &str = "a.id, a.patient_id, a.appointment_type_id, a.provider_id,
    a.start_time, a.end_time, a.status, a.reason, a.notes, a.created_by,
    a.created_at, a.updated_at";

pub fn get_appointment(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments a WHERE a.id = ?1"
    ))?;
    let result = stmt.query_row(params![id.to_string()], appointment_row);
    match result {
        Ok(row) => Ok(Some(appointment_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_appointment(
    conn: &Connection,
    appointment: &Appointment,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET patient_id = ?2, appointment_type_id = ?3, provider_id = ?4,
         start_time = ?5, end_time = ?6, status = ?7, reason = ?8, notes = ?9, updated_at = ?10
         WHERE id = ?1",
        params![
            appointment.id.to_string(),
            appointment.patient_id.to_string(),
            appointment.appointment_type_id.to_string(),
            appointment.provider_id.to_string(),
            appointment.start_time.to_string(),
            appointment.end_time.to_string(),
            appointment.status.as_str(),
            appointment.reason,
            appointment.notes,
            appointment.updated_at.to_string(),
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Appointment", appointment.id));
    }
    Ok(())
}

pub fn set_appointment_status(
    conn: &Connection,
    id: &Uuid,
    status: AppointmentStatus,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![id.to_string(), status.as_str(), now.to_string()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Appointment", id));
    }
    Ok(())
}

/// Appointment joined with the names needed by list and calendar views.
#[derive(Debug, Clone)]
pub struct AppointmentSummary {
    pub appointment: Appointment,
    pub patient_name: String,
    pub type_name: String,
}

pub struct AppointmentFilter {
    pub provider_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub appointment_type_id: Option<Uuid>,
    /// Inclusive lower bound on start_time.
    pub from: Option<NaiveDateTime>,
    /// Exclusive upper bound on start_time.
    pub to: Option<NaiveDateTime>,
    /// Patient name or MRN substring.
    pub query: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for AppointmentFilter {
    fn default() -> Self {
        Self {
            provider_id: None,
            patient_id: None,
            status: None,
            appointment_type_id: None,
            from: None,
            to: None,
            query: None,
            limit: 15,
            offset: 0,
        }
    }
}

pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<AppointmentSummary>, DatabaseError> {
    let mut sql = format!(
        "SELECT {APPOINTMENT_COLUMNS}, p.first_name, p.last_name, t.name
         FROM appointments a
         JOIN patients p ON p.id = a.patient_id
         JOIN appointment_types t ON t.id = a.appointment_type_id
         WHERE 1=1"
    );
    let mut args: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(provider) = &filter.provider_id {
        sql.push_str(" AND a.provider_id = ?");
        args.push(Box::new(provider.to_string()));
    }
    if let Some(patient) = &filter.patient_id {
        sql.push_str(" AND a.patient_id = ?");
        args.push(Box::new(patient.to_string()));
    }
    if let Some(status) = filter.status {
        sql.push_str(" AND a.status = ?");
        args.push(Box::new(status.as_str()));
    }
    if let Some(type_id) = &filter.appointment_type_id {
        sql.push_str(" AND a.appointment_type_id = ?");
        args.push(Box::new(type_id.to_string()));
    }
    if let Some(from) = filter.from {
        sql.push_str(" AND a.start_time >= ?");
        args.push(Box::new(from.to_string()));
    }
    if let Some(to) = filter.to {
        sql.push_str(" AND a.start_time < ?");
        args.push(Box::new(to.to_string()));
    }
    if let Some(q) = &filter.query {
        let pattern = format!("%{q}%");
        sql.push_str(
            " AND (p.first_name LIKE ? COLLATE NOCASE OR p.last_name LIKE ? COLLATE NOCASE
               OR p.medical_record_number LIKE ?)",
        );
        for _ in 0..3 {
            args.push(Box::new(pattern.clone()));
        }
    }
    sql.push_str(" ORDER BY a.start_time LIMIT ? OFFSET ?");
    args.push(Box::new(filter.limit));
    args.push(Box::new(filter.offset));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(args.iter().map(|a| a.as_ref())), |row| {
        Ok((
            appointment_row(row)?,
            row.get::<_, String>(12)?,
            row.get::<_, String>(13)?,
            row.get::<_, String>(14)?,
        ))
    })?;

    let mut summaries = Vec::new();
    for row in rows {
        let (appt, first_name, last_name, type_name) = row?;
        summaries.push(AppointmentSummary {
            appointment: appointment_from_row(appt)?,
            patient_name: format!("{first_name} {last_name}"),
            type_name,
        });
    }
    Ok(summaries)
}

pub fn count_appointments_between(
    conn: &Connection,
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM appointments WHERE start_time >= ?1 AND start_time < ?2",
        params![from.to_string(), to.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use chrono::NaiveDate;

    fn seed_type(conn: &Connection, duration: u32) -> AppointmentType {
        let t = AppointmentType {
            id: Uuid::new_v4(),
            name: "Consultation".into(),
            duration_minutes: duration,
            description: None,
            default_notes: None,
            color_code: "#305F6D".into(),
            is_active: true,
        };
        insert_appointment_type(conn, &t).unwrap();
        t
    }

    #[test]
    fn toggle_type_flips_and_reports() {
        let conn = open_memory_database().unwrap();
        let t = seed_type(&conn, 30);
        assert!(!toggle_appointment_type_active(&conn, &t.id).unwrap());
        assert!(toggle_appointment_type_active(&conn, &t.id).unwrap());
    }

    #[test]
    fn toggle_unknown_type_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = toggle_appointment_type_active(&conn, &Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn list_types_can_exclude_inactive() {
        let conn = open_memory_database().unwrap();
        let t = seed_type(&conn, 30);
        toggle_appointment_type_active(&conn, &t.id).unwrap();
        assert!(list_appointment_types(&conn, false).unwrap().is_empty());
        assert_eq!(list_appointment_types(&conn, true).unwrap().len(), 1);
    }

    #[test]
    fn count_between_is_half_open() {
        let conn = open_memory_database().unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let from = day.and_hms_opt(0, 0, 0).unwrap();
        let to = day.succ_opt().unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(count_appointments_between(&conn, from, to).unwrap(), 0);
    }
}
