use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Connection};
use uuid::Uuid;

use super::{parse_date, parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::{BloodType, Gender};
use crate::models::Patient;

const PATIENT_COLUMNS: &str = "id, medical_record_number, first_name, last_name, preferred_name,
    date_of_birth, gender, email, phone_primary, phone_emergency, address,
    emergency_contact_name, emergency_contact_relation, emergency_contact_phone,
    insurance_provider, insurance_member_id, blood_type, height_cm, weight_kg,
    is_active, created_at, updated_at";

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, medical_record_number, first_name, last_name, preferred_name,
         date_of_birth, gender, email, phone_primary, phone_emergency, address,
         emergency_contact_name, emergency_contact_relation, emergency_contact_phone,
         insurance_provider, insurance_member_id, blood_type, height_cm, weight_kg,
         is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                 ?17, ?18, ?19, ?20, ?21, ?22)",
        params![
            patient.id.to_string(),
            patient.medical_record_number,
            patient.first_name,
            patient.last_name,
            patient.preferred_name,
            patient.date_of_birth.to_string(),
            patient.gender.as_str(),
            patient.email,
            patient.phone_primary,
            patient.phone_emergency,
            patient.address,
            patient.emergency_contact_name,
            patient.emergency_contact_relation,
            patient.emergency_contact_phone,
            patient.insurance_provider,
            patient.insurance_member_id,
            patient.blood_type.as_str(),
            patient.height_cm,
            patient.weight_kg,
            patient.is_active as i32,
            patient.created_at.to_string(),
            patient.updated_at.to_string(),
        ],
    )?;
    Ok(())
}

struct PatientRow {
    id: String,
    medical_record_number: String,
    first_name: String,
    last_name: String,
    preferred_name: Option<String>,
    date_of_birth: String,
    gender: String,
    email: Option<String>,
    phone_primary: String,
    phone_emergency: Option<String>,
    address: String,
    emergency_contact_name: String,
    emergency_contact_relation: String,
    emergency_contact_phone: String,
    insurance_provider: Option<String>,
    insurance_member_id: Option<String>,
    blood_type: String,
    height_cm: Option<u32>,
    weight_kg: Option<f64>,
    is_active: i32,
    created_at: String,
    updated_at: String,
}

fn patient_row(row: &rusqlite::Row<'_>) -> Result<PatientRow, rusqlite::Error> {
    Ok(PatientRow {
        id: row.get(0)?,
        medical_record_number: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        preferred_name: row.get(4)?,
        date_of_birth: row.get(5)?,
        gender: row.get(6)?,
        email: row.get(7)?,
        phone_primary: row.get(8)?,
        phone_emergency: row.get(9)?,
        address: row.get(10)?,
        emergency_contact_name: row.get(11)?,
        emergency_contact_relation: row.get(12)?,
        emergency_contact_phone: row.get(13)?,
        insurance_provider: row.get(14)?,
        insurance_member_id: row.get(15)?,
        blood_type: row.get(16)?,
        height_cm: row.get(17)?,
        weight_kg: row.get(18)?,
        is_active: row.get(19)?,
        created_at: row.get(20)?,
        updated_at: row.get(21)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    Ok(Patient {
        id: parse_uuid(&row.id)?,
        medical_record_number: row.medical_record_number,
        first_name: row.first_name,
        last_name: row.last_name,
        preferred_name: row.preferred_name,
        date_of_birth: parse_date(&row.date_of_birth)?,
        gender: Gender::from_str(&row.gender)?,
        email: row.email,
        phone_primary: row.phone_primary,
        phone_emergency: row.phone_emergency,
        address: row.address,
        emergency_contact_name: row.emergency_contact_name,
        emergency_contact_relation: row.emergency_contact_relation,
        emergency_contact_phone: row.emergency_contact_phone,
        insurance_provider: row.insurance_provider,
        insurance_member_id: row.insurance_member_id,
        blood_type: BloodType::from_str(&row.blood_type)?,
        height_cm: row.height_cm,
        weight_kg: row.weight_kg,
        is_active: row.is_active != 0,
        created_at: parse_datetime(&row.created_at)?,
        updated_at: parse_datetime(&row.updated_at)?,
    })
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let mut stmt =
        conn.prepare(&format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"))?;
    let result = stmt.query_row(params![id.to_string()], patient_row);
    match result {
        Ok(row) => Ok(Some(patient_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Search + status filter with the list view's paging.
pub struct PatientFilter {
    pub query: Option<String>,
    pub is_active: Option<bool>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for PatientFilter {
    fn default() -> Self {
        Self {
            query: None,
            is_active: Some(true),
            limit: 20,
            offset: 0,
        }
    }
}

pub fn list_patients(
    conn: &Connection,
    filter: &PatientFilter,
) -> Result<Vec<Patient>, DatabaseError> {
    let mut sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE 1=1");
    let mut args: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(active) = filter.is_active {
        sql.push_str(" AND is_active = ?");
        args.push(Box::new(active as i32));
    }
    if let Some(q) = &filter.query {
        let pattern = format!("%{q}%");
        sql.push_str(
            " AND (first_name LIKE ? COLLATE NOCASE OR last_name LIKE ? COLLATE NOCASE
               OR medical_record_number LIKE ? OR email LIKE ? COLLATE NOCASE
               OR phone_primary LIKE ?)",
        );
        for _ in 0..5 {
            args.push(Box::new(pattern.clone()));
        }
    }
    sql.push_str(" ORDER BY last_name, first_name LIMIT ? OFFSET ?");
    args.push(Box::new(filter.limit));
    args.push(Box::new(filter.offset));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(args.iter().map(|a| a.as_ref())), patient_row)?;
    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row?)?);
    }
    Ok(patients)
}

pub fn count_patients(conn: &Connection, is_active: Option<bool>) -> Result<i64, DatabaseError> {
    let count = match is_active {
        Some(active) => conn.query_row(
            "SELECT COUNT(*) FROM patients WHERE is_active = ?1",
            params![active as i32],
            |row| row.get(0),
        )?,
        None => conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?,
    };
    Ok(count)
}

/// Full-row update; MRN may change (uniqueness enforced by the schema).
pub fn update_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE patients SET medical_record_number = ?2, first_name = ?3, last_name = ?4,
         preferred_name = ?5, date_of_birth = ?6, gender = ?7, email = ?8,
         phone_primary = ?9, phone_emergency = ?10, address = ?11,
         emergency_contact_name = ?12, emergency_contact_relation = ?13,
         emergency_contact_phone = ?14, insurance_provider = ?15, insurance_member_id = ?16,
         blood_type = ?17, height_cm = ?18, weight_kg = ?19, is_active = ?20, updated_at = ?21
         WHERE id = ?1",
        params![
            patient.id.to_string(),
            patient.medical_record_number,
            patient.first_name,
            patient.last_name,
            patient.preferred_name,
            patient.date_of_birth.to_string(),
            patient.gender.as_str(),
            patient.email,
            patient.phone_primary,
            patient.phone_emergency,
            patient.address,
            patient.emergency_contact_name,
            patient.emergency_contact_relation,
            patient.emergency_contact_phone,
            patient.insurance_provider,
            patient.insurance_member_id,
            patient.blood_type.as_str(),
            patient.height_cm,
            patient.weight_kg,
            patient.is_active as i32,
            patient.updated_at.to_string(),
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Patient", patient.id));
    }
    Ok(())
}

/// Refresh the denormalized height/weight cache after a vitals entry.
pub fn update_patient_body_metrics(
    conn: &Connection,
    id: &Uuid,
    height_cm: Option<u32>,
    weight_kg: Option<f64>,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE patients SET
         height_cm = COALESCE(?2, height_cm),
         weight_kg = COALESCE(?3, weight_kg),
         updated_at = ?4
         WHERE id = ?1",
        params![id.to_string(), height_cm, weight_kg, now.to_string()],
    )?;
    Ok(())
}

/// Count records sharing the same full name, or the same email when given.
/// Used for the duplicate warning after create.
pub fn count_potential_duplicates(
    conn: &Connection,
    first_name: &str,
    last_name: &str,
    email: Option<&str>,
    exclude_id: &Uuid,
) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM patients
         WHERE id != ?1
           AND ((LOWER(first_name) = LOWER(?2) AND LOWER(last_name) = LOWER(?3))
                OR (?4 IS NOT NULL AND LOWER(email) = LOWER(?4)))",
        params![exclude_id.to_string(), first_name, last_name, email],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// One UPDATE over exactly the given ids. Returns the number of rows touched.
pub fn bulk_set_active(
    conn: &Connection,
    ids: &[Uuid],
    active: bool,
    now: NaiveDateTime,
) -> Result<usize, DatabaseError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "UPDATE patients SET is_active = ?, updated_at = ? WHERE id IN ({placeholders})"
    );
    let mut args: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::with_capacity(ids.len() + 2);
    args.push(Box::new(active as i32));
    args.push(Box::new(now.to_string()));
    for id in ids {
        args.push(Box::new(id.to_string()));
    }
    let changed = conn.execute(&sql, params_from_iter(args.iter().map(|a| a.as_ref())))?;
    Ok(changed)
}
