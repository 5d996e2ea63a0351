//! Clinical artifacts hanging off an appointment.

use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{parse_date, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::{FollowUpPriority, Frequency, LabOrderStatus};
use crate::models::{FollowUp, LabOrder, Prescription};

// ── Prescriptions ──────────────────────────────────────────

pub fn insert_prescription(
    conn: &Connection,
    prescription: &Prescription,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO prescriptions (id, appointment_id, medication_name, dosage, frequency,
         duration_days, refills, instructions, notes, prescribed_by, date_prescribed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            prescription.id.to_string(),
            prescription.appointment_id.to_string(),
            prescription.medication_name,
            prescription.dosage,
            prescription.frequency.as_str(),
            prescription.duration_days,
            prescription.refills,
            prescription.instructions,
            prescription.notes,
            prescription.prescribed_by.to_string(),
            prescription.date_prescribed.to_string(),
        ],
    )?;
    Ok(())
}

pub fn list_prescriptions(
    conn: &Connection,
    appointment_id: &Uuid,
) -> Result<Vec<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, appointment_id, medication_name, dosage, frequency, duration_days,
         refills, instructions, notes, prescribed_by, date_prescribed
         FROM prescriptions WHERE appointment_id = ?1 ORDER BY date_prescribed DESC",
    )?;
    let rows = stmt.query_map(params![appointment_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, u32>(5)?,
            row.get::<_, u32>(6)?,
            row.get::<_, String>(7)?,
            row.get::<_, Option<String>>(8)?,
            row.get::<_, String>(9)?,
            row.get::<_, String>(10)?,
        ))
    })?;

    let mut prescriptions = Vec::new();
    for row in rows {
        let (
            id,
            appointment,
            medication_name,
            dosage,
            frequency,
            duration_days,
            refills,
            instructions,
            notes,
            prescribed_by,
            date_prescribed,
        ) = row?;
        prescriptions.push(Prescription {
            id: parse_uuid(&id)?,
            appointment_id: parse_uuid(&appointment)?,
            medication_name,
            dosage,
            frequency: Frequency::from_str(&frequency)?,
            duration_days,
            refills,
            instructions,
            notes,
            prescribed_by: parse_uuid(&prescribed_by)?,
            date_prescribed: parse_date(&date_prescribed)?,
        });
    }
    Ok(prescriptions)
}

// ── Lab orders ─────────────────────────────────────────────

pub fn insert_lab_order(conn: &Connection, order: &LabOrder) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO lab_orders (id, appointment_id, lab_name, description, status,
         ordered_by, ordered_date, results_date, results, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            order.id.to_string(),
            order.appointment_id.to_string(),
            order.lab_name,
            order.description,
            order.status.as_str(),
            order.ordered_by.to_string(),
            order.ordered_date.to_string(),
            order.results_date.map(|d| d.to_string()),
            order.results,
            order.notes,
        ],
    )?;
    Ok(())
}

pub fn list_lab_orders(
    conn: &Connection,
    appointment_id: &Uuid,
) -> Result<Vec<LabOrder>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, appointment_id, lab_name, description, status, ordered_by,
         ordered_date, results_date, results, notes
         FROM lab_orders WHERE appointment_id = ?1 ORDER BY ordered_date DESC",
    )?;
    let rows = stmt.query_map(params![appointment_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, Option<String>>(7)?,
            row.get::<_, Option<String>>(8)?,
            row.get::<_, Option<String>>(9)?,
        ))
    })?;

    let mut orders = Vec::new();
    for row in rows {
        let (
            id,
            appointment,
            lab_name,
            description,
            status,
            ordered_by,
            ordered_date,
            results_date,
            results,
            notes,
        ) = row?;
        orders.push(LabOrder {
            id: parse_uuid(&id)?,
            appointment_id: parse_uuid(&appointment)?,
            lab_name,
            description,
            status: LabOrderStatus::from_str(&status)?,
            ordered_by: parse_uuid(&ordered_by)?,
            ordered_date: parse_date(&ordered_date)?,
            results_date: results_date.and_then(|d| parse_date(&d).ok()),
            results,
            notes,
        });
    }
    Ok(orders)
}

// ── Follow-ups ─────────────────────────────────────────────

pub fn insert_follow_up(conn: &Connection, follow_up: &FollowUp) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO follow_ups (id, appointment_id, recommended_time_frame, reason,
         priority, notes, is_scheduled, follow_up_appointment_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            follow_up.id.to_string(),
            follow_up.appointment_id.to_string(),
            follow_up.recommended_time_frame,
            follow_up.reason,
            follow_up.priority.as_str(),
            follow_up.notes,
            follow_up.is_scheduled as i32,
            follow_up.follow_up_appointment_id.map(|id| id.to_string()),
        ],
    )?;
    Ok(())
}

const FOLLOW_UP_COLUMNS: &str = "id, appointment_id, recommended_time_frame, reason,
    priority, notes, is_scheduled, follow_up_appointment_id";

fn follow_up_row(
    row: &rusqlite::Row<'_>,
) -> Result<(String, String, String, String, String, Option<String>, i32, Option<String>), rusqlite::Error> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn follow_up_from_tuple(
    t: (String, String, String, String, String, Option<String>, i32, Option<String>),
) -> Result<FollowUp, DatabaseError> {
    let (id, appointment, recommended_time_frame, reason, priority, notes, is_scheduled, linked) =
        t;
    Ok(FollowUp {
        id: parse_uuid(&id)?,
        appointment_id: parse_uuid(&appointment)?,
        recommended_time_frame,
        reason,
        priority: FollowUpPriority::from_str(&priority)?,
        notes,
        is_scheduled: is_scheduled != 0,
        follow_up_appointment_id: linked.and_then(|s| Uuid::parse_str(&s).ok()),
    })
}

pub fn get_follow_up(conn: &Connection, id: &Uuid) -> Result<Option<FollowUp>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {FOLLOW_UP_COLUMNS} FROM follow_ups WHERE id = ?1"
    ))?;
    let result = stmt.query_row(params![id.to_string()], follow_up_row);
    match result {
        Ok(t) => Ok(Some(follow_up_from_tuple(t)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_follow_ups(
    conn: &Connection,
    appointment_id: &Uuid,
) -> Result<Vec<FollowUp>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {FOLLOW_UP_COLUMNS} FROM follow_ups
         WHERE appointment_id = ?1
         ORDER BY CASE priority WHEN 'high' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END"
    ))?;
    let rows = stmt.query_map(params![appointment_id.to_string()], follow_up_row)?;
    let mut follow_ups = Vec::new();
    for row in rows {
        follow_ups.push(follow_up_from_tuple(row?)?);
    }
    Ok(follow_ups)
}

pub fn mark_follow_up_scheduled(
    conn: &Connection,
    id: &Uuid,
    appointment_id: &Uuid,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE follow_ups SET is_scheduled = 1, follow_up_appointment_id = ?2 WHERE id = ?1",
        params![id.to_string(), appointment_id.to_string()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("FollowUp", id));
    }
    Ok(())
}
