//! Satellite records: the one-to-many children of a patient. Each has an
//! insert scoped to a patient id and an ordered list for the detail view.

use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{parse_date, parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

// ── Allergies ──────────────────────────────────────────────

pub fn insert_allergy(conn: &Connection, allergy: &Allergy) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO allergies (id, patient_id, allergy_type, allergen, reaction, severity,
         date_identified, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            allergy.id.to_string(),
            allergy.patient_id.to_string(),
            allergy.allergy_type.as_str(),
            allergy.allergen,
            allergy.reaction,
            allergy.severity.as_str(),
            allergy.date_identified.to_string(),
            allergy.notes,
        ],
    )?;
    Ok(())
}

pub fn list_allergies(conn: &Connection, patient_id: &Uuid) -> Result<Vec<Allergy>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, allergy_type, allergen, reaction, severity, date_identified, notes
         FROM allergies WHERE patient_id = ?1 ORDER BY severity DESC",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, Option<String>>(7)?,
        ))
    })?;

    let mut allergies = Vec::new();
    for row in rows {
        let (id, patient, allergy_type, allergen, reaction, severity, date_identified, notes) =
            row?;
        allergies.push(Allergy {
            id: parse_uuid(&id)?,
            patient_id: parse_uuid(&patient)?,
            allergy_type: AllergyType::from_str(&allergy_type)?,
            allergen,
            reaction,
            severity: AllergySeverity::from_str(&severity)?,
            date_identified: parse_date(&date_identified)?,
            notes,
        });
    }
    Ok(allergies)
}

// ── Chronic conditions ─────────────────────────────────────

pub fn insert_condition(
    conn: &Connection,
    condition: &ChronicCondition,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO chronic_conditions (id, patient_id, condition_name, diagnosis_date,
         treating_physician, notes, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            condition.id.to_string(),
            condition.patient_id.to_string(),
            condition.condition_name,
            condition.diagnosis_date.to_string(),
            condition.treating_physician,
            condition.notes,
            condition.is_active as i32,
        ],
    )?;
    Ok(())
}

pub fn list_conditions(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<ChronicCondition>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, condition_name, diagnosis_date, treating_physician, notes, is_active
         FROM chronic_conditions WHERE patient_id = ?1
         ORDER BY is_active DESC, condition_name",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, i32>(6)?,
        ))
    })?;

    let mut conditions = Vec::new();
    for row in rows {
        let (id, patient, condition_name, diagnosis_date, treating_physician, notes, is_active) =
            row?;
        conditions.push(ChronicCondition {
            id: parse_uuid(&id)?,
            patient_id: parse_uuid(&patient)?,
            condition_name,
            diagnosis_date: parse_date(&diagnosis_date)?,
            treating_physician,
            notes,
            is_active: is_active != 0,
        });
    }
    Ok(conditions)
}

// ── Medications ────────────────────────────────────────────

pub fn insert_medication(conn: &Connection, med: &Medication) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medications (id, patient_id, medication_name, dosage, frequency,
         start_date, end_date, prescribing_doctor, reason, notes, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            med.id.to_string(),
            med.patient_id.to_string(),
            med.medication_name,
            med.dosage,
            med.frequency.as_str(),
            med.start_date.to_string(),
            med.end_date.map(|d| d.to_string()),
            med.prescribing_doctor,
            med.reason,
            med.notes,
            med.is_active as i32,
        ],
    )?;
    Ok(())
}

pub fn list_medications(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Medication>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, medication_name, dosage, frequency, start_date, end_date,
         prescribing_doctor, reason, notes, is_active
         FROM medications WHERE patient_id = ?1
         ORDER BY is_active DESC, medication_name",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, Option<String>>(6)?,
            row.get::<_, String>(7)?,
            row.get::<_, Option<String>>(8)?,
            row.get::<_, Option<String>>(9)?,
            row.get::<_, i32>(10)?,
        ))
    })?;

    let mut meds = Vec::new();
    for row in rows {
        let (
            id,
            patient,
            medication_name,
            dosage,
            frequency,
            start_date,
            end_date,
            prescribing_doctor,
            reason,
            notes,
            is_active,
        ) = row?;
        meds.push(Medication {
            id: parse_uuid(&id)?,
            patient_id: parse_uuid(&patient)?,
            medication_name,
            dosage,
            frequency: Frequency::from_str(&frequency)?,
            start_date: parse_date(&start_date)?,
            end_date: end_date.and_then(|d| parse_date(&d).ok()),
            prescribing_doctor,
            reason,
            notes,
            is_active: is_active != 0,
        });
    }
    Ok(meds)
}

// ── Medical history ────────────────────────────────────────

pub fn insert_medical_history(
    conn: &Connection,
    entry: &MedicalHistory,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medical_history (id, patient_id, entry_type, description, date,
         facility, provider, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            entry.id.to_string(),
            entry.patient_id.to_string(),
            entry.entry_type.as_str(),
            entry.description,
            entry.date.to_string(),
            entry.facility,
            entry.provider,
            entry.notes,
        ],
    )?;
    Ok(())
}

pub fn list_medical_history(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<MedicalHistory>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, entry_type, description, date, facility, provider, notes
         FROM medical_history WHERE patient_id = ?1 ORDER BY date DESC",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, Option<String>>(6)?,
            row.get::<_, Option<String>>(7)?,
        ))
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let (id, patient, entry_type, description, date, facility, provider, notes) = row?;
        entries.push(MedicalHistory {
            id: parse_uuid(&id)?,
            patient_id: parse_uuid(&patient)?,
            entry_type: HistoryEntryType::from_str(&entry_type)?,
            description,
            date: parse_date(&date)?,
            facility,
            provider,
            notes,
        });
    }
    Ok(entries)
}

// ── Family history ─────────────────────────────────────────

pub fn insert_family_history(
    conn: &Connection,
    entry: &FamilyHistory,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO family_history (id, patient_id, relationship, condition, age_at_diagnosis, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.id.to_string(),
            entry.patient_id.to_string(),
            entry.relationship.as_str(),
            entry.condition,
            entry.age_at_diagnosis,
            entry.notes,
        ],
    )?;
    Ok(())
}

pub fn list_family_history(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<FamilyHistory>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, relationship, condition, age_at_diagnosis, notes
         FROM family_history WHERE patient_id = ?1 ORDER BY relationship",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, Option<u32>>(4)?,
            row.get::<_, Option<String>>(5)?,
        ))
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let (id, patient, relationship, condition, age_at_diagnosis, notes) = row?;
        entries.push(FamilyHistory {
            id: parse_uuid(&id)?,
            patient_id: parse_uuid(&patient)?,
            relationship: FamilyRelationship::from_str(&relationship)?,
            condition,
            age_at_diagnosis,
            notes,
        });
    }
    Ok(entries)
}

// ── Immunizations ──────────────────────────────────────────

pub fn insert_immunization(
    conn: &Connection,
    immunization: &Immunization,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO immunizations (id, patient_id, vaccine_name, date_administered,
         administered_by, lot_number, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            immunization.id.to_string(),
            immunization.patient_id.to_string(),
            immunization.vaccine_name,
            immunization.date_administered.to_string(),
            immunization.administered_by,
            immunization.lot_number,
            immunization.notes,
        ],
    )?;
    Ok(())
}

pub fn list_immunizations(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Immunization>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, vaccine_name, date_administered, administered_by, lot_number, notes
         FROM immunizations WHERE patient_id = ?1 ORDER BY date_administered DESC",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, Option<String>>(6)?,
        ))
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let (id, patient, vaccine_name, date_administered, administered_by, lot_number, notes) =
            row?;
        entries.push(Immunization {
            id: parse_uuid(&id)?,
            patient_id: parse_uuid(&patient)?,
            vaccine_name,
            date_administered: parse_date(&date_administered)?,
            administered_by,
            lot_number,
            notes,
        });
    }
    Ok(entries)
}

// ── Vital signs ────────────────────────────────────────────

pub fn insert_vital_signs(conn: &Connection, vitals: &VitalSigns) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO vital_signs (id, patient_id, date_recorded, temperature, heart_rate,
         blood_pressure_systolic, blood_pressure_diastolic, respiratory_rate,
         oxygen_saturation, height_cm, weight_kg, recorded_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            vitals.id.to_string(),
            vitals.patient_id.to_string(),
            vitals.date_recorded.to_string(),
            vitals.temperature,
            vitals.heart_rate,
            vitals.blood_pressure_systolic,
            vitals.blood_pressure_diastolic,
            vitals.respiratory_rate,
            vitals.oxygen_saturation,
            vitals.height_cm,
            vitals.weight_kg,
            vitals.recorded_by.map(|id| id.to_string()),
        ],
    )?;
    Ok(())
}

fn vitals_from_row(row: &rusqlite::Row<'_>) -> Result<VitalSignsRow, rusqlite::Error> {
    Ok(VitalSignsRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        date_recorded: row.get(2)?,
        temperature: row.get(3)?,
        heart_rate: row.get(4)?,
        blood_pressure_systolic: row.get(5)?,
        blood_pressure_diastolic: row.get(6)?,
        respiratory_rate: row.get(7)?,
        oxygen_saturation: row.get(8)?,
        height_cm: row.get(9)?,
        weight_kg: row.get(10)?,
        recorded_by: row.get(11)?,
    })
}

struct VitalSignsRow {
    id: String,
    patient_id: String,
    date_recorded: String,
    temperature: Option<f64>,
    heart_rate: Option<u32>,
    blood_pressure_systolic: Option<u32>,
    blood_pressure_diastolic: Option<u32>,
    respiratory_rate: Option<u32>,
    oxygen_saturation: Option<u32>,
    height_cm: Option<u32>,
    weight_kg: Option<f64>,
    recorded_by: Option<String>,
}

fn vitals_from(row: VitalSignsRow) -> Result<VitalSigns, DatabaseError> {
    Ok(VitalSigns {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        date_recorded: parse_datetime(&row.date_recorded)?,
        temperature: row.temperature,
        heart_rate: row.heart_rate,
        blood_pressure_systolic: row.blood_pressure_systolic,
        blood_pressure_diastolic: row.blood_pressure_diastolic,
        respiratory_rate: row.respiratory_rate,
        oxygen_saturation: row.oxygen_saturation,
        height_cm: row.height_cm,
        weight_kg: row.weight_kg,
        recorded_by: row.recorded_by.and_then(|s| Uuid::parse_str(&s).ok()),
    })
}

const VITALS_COLUMNS: &str = "id, patient_id, date_recorded, temperature, heart_rate,
    blood_pressure_systolic, blood_pressure_diastolic, respiratory_rate,
    oxygen_saturation, height_cm, weight_kg, recorded_by";

pub fn latest_vitals(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Option<VitalSigns>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VITALS_COLUMNS} FROM vital_signs
         WHERE patient_id = ?1 ORDER BY date_recorded DESC LIMIT 1"
    ))?;
    let result = stmt.query_row(params![patient_id.to_string()], vitals_from_row);
    match result {
        Ok(row) => Ok(Some(vitals_from(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_vital_signs(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<VitalSigns>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VITALS_COLUMNS} FROM vital_signs
         WHERE patient_id = ?1 ORDER BY date_recorded DESC"
    ))?;
    let rows = stmt.query_map(params![patient_id.to_string()], vitals_from_row)?;
    let mut entries = Vec::new();
    for row in rows {
        entries.push(vitals_from(row?)?);
    }
    Ok(entries)
}

// ── Notes ──────────────────────────────────────────────────

pub fn insert_note(conn: &Connection, note: &PatientNote) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patient_notes (id, patient_id, created_by, created_at, updated_at, note)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            note.id.to_string(),
            note.patient_id.to_string(),
            note.created_by.to_string(),
            note.created_at.to_string(),
            note.updated_at.to_string(),
            note.note,
        ],
    )?;
    Ok(())
}

pub fn list_notes(conn: &Connection, patient_id: &Uuid) -> Result<Vec<PatientNote>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, created_by, created_at, updated_at, note
         FROM patient_notes WHERE patient_id = ?1 ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut notes = Vec::new();
    for row in rows {
        let (id, patient, created_by, created_at, updated_at, note) = row?;
        notes.push(PatientNote {
            id: parse_uuid(&id)?,
            patient_id: parse_uuid(&patient)?,
            created_by: parse_uuid(&created_by)?,
            created_at: parse_datetime(&created_at)?,
            updated_at: parse_datetime(&updated_at)?,
            note,
        });
    }
    Ok(notes)
}
