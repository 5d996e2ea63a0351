//! Per-user patient interaction markers: recency and favorites.

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{FavoritePatient, RecentPatient};

/// Record that `user_id` viewed `patient_id`. One row per pair; repeat
/// views only move the timestamp forward.
pub fn upsert_recent_patient(
    conn: &Connection,
    user_id: &Uuid,
    patient_id: &Uuid,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO recent_patients (id, user_id, patient_id, last_viewed)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (user_id, patient_id) DO UPDATE SET last_viewed = excluded.last_viewed",
        params![
            Uuid::new_v4().to_string(),
            user_id.to_string(),
            patient_id.to_string(),
            now.to_string(),
        ],
    )?;
    Ok(())
}

pub fn list_recent_patients(
    conn: &Connection,
    user_id: &Uuid,
    limit: u32,
) -> Result<Vec<RecentPatient>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, patient_id, last_viewed FROM recent_patients
         WHERE user_id = ?1 ORDER BY last_viewed DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![user_id.to_string(), limit], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut recents = Vec::new();
    for row in rows {
        let (id, user, patient, last_viewed) = row?;
        recents.push(RecentPatient {
            id: parse_uuid(&id)?,
            user_id: parse_uuid(&user)?,
            patient_id: parse_uuid(&patient)?,
            last_viewed: parse_datetime(&last_viewed)?,
        });
    }
    Ok(recents)
}

pub fn favorite_exists(
    conn: &Connection,
    user_id: &Uuid,
    patient_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM favorite_patients WHERE user_id = ?1 AND patient_id = ?2",
        params![user_id.to_string(), patient_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn insert_favorite(conn: &Connection, favorite: &FavoritePatient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO favorite_patients (id, user_id, patient_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            favorite.id.to_string(),
            favorite.user_id.to_string(),
            favorite.patient_id.to_string(),
            favorite.created_at.to_string(),
        ],
    )?;
    Ok(())
}

pub fn delete_favorite(
    conn: &Connection,
    user_id: &Uuid,
    patient_id: &Uuid,
) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM favorite_patients WHERE user_id = ?1 AND patient_id = ?2",
        params![user_id.to_string(), patient_id.to_string()],
    )?;
    Ok(())
}

pub fn list_favorites(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Vec<FavoritePatient>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, patient_id, created_at FROM favorite_patients
         WHERE user_id = ?1 ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map(params![user_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut favorites = Vec::new();
    for row in rows {
        let (id, user, patient, created_at) = row?;
        favorites.push(FavoritePatient {
            id: parse_uuid(&id)?,
            user_id: parse_uuid(&user)?,
            patient_id: parse_uuid(&patient)?,
            created_at: parse_datetime(&created_at)?,
        });
    }
    Ok(favorites)
}
