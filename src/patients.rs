//! Patient record service: demographics, satellite records, per-user
//! recency/favorites, and the bulk status actions.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::repository::{self, PatientFilter};
use crate::db::DatabaseError;
use crate::models::enums::{
    AllergySeverity, AllergyType, BloodType, BulkAction, FamilyRelationship, Frequency, Gender,
    HistoryEntryType,
};
use crate::models::{
    Allergy, ChronicCondition, FamilyHistory, Immunization, MedicalHistory, Medication, Patient,
    PatientNote, VitalSigns,
};

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("{0}")]
    Validation(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl PatientError {
    fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

fn require_patient(conn: &Connection, id: &Uuid) -> Result<Patient, PatientError> {
    repository::get_patient(conn, id)?.ok_or_else(|| PatientError::not_found("Patient", id))
}

// ═══════════════════════════════════════════
// Create / edit / status
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct PatientInput {
    pub medical_record_number: String,
    pub first_name: String,
    pub last_name: String,
    pub preferred_name: Option<String>,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub email: Option<String>,
    pub phone_primary: String,
    pub phone_emergency: Option<String>,
    pub address: String,
    pub emergency_contact_name: String,
    pub emergency_contact_relation: String,
    pub emergency_contact_phone: String,
    pub insurance_provider: Option<String>,
    pub insurance_member_id: Option<String>,
    pub blood_type: BloodType,
}

/// Create result; `potential_duplicates` counts other records with the
/// same name or email so the caller can warn, never block.
#[derive(Debug, Clone, Serialize)]
pub struct PatientCreated {
    pub patient: Patient,
    pub potential_duplicates: i64,
}

pub fn create_patient(
    conn: &Connection,
    input: &PatientInput,
    now: NaiveDateTime,
) -> Result<PatientCreated, PatientError> {
    if input.medical_record_number.trim().is_empty() {
        return Err(PatientError::Validation("MRN must not be empty".into()));
    }
    let patient = Patient {
        id: Uuid::new_v4(),
        medical_record_number: input.medical_record_number.clone(),
        first_name: input.first_name.clone(),
        last_name: input.last_name.clone(),
        preferred_name: input.preferred_name.clone(),
        date_of_birth: input.date_of_birth,
        gender: input.gender,
        email: input.email.clone(),
        phone_primary: input.phone_primary.clone(),
        phone_emergency: input.phone_emergency.clone(),
        address: input.address.clone(),
        emergency_contact_name: input.emergency_contact_name.clone(),
        emergency_contact_relation: input.emergency_contact_relation.clone(),
        emergency_contact_phone: input.emergency_contact_phone.clone(),
        insurance_provider: input.insurance_provider.clone(),
        insurance_member_id: input.insurance_member_id.clone(),
        blood_type: input.blood_type,
        height_cm: None,
        weight_kg: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    if let Err(e) = repository::insert_patient(conn, &patient) {
        if e.is_unique_violation() {
            return Err(PatientError::Validation(format!(
                "a patient with MRN '{}' already exists",
                input.medical_record_number
            )));
        }
        return Err(e.into());
    }
    let potential_duplicates = repository::count_potential_duplicates(
        conn,
        &patient.first_name,
        &patient.last_name,
        patient.email.as_deref(),
        &patient.id,
    )?;
    tracing::info!(patient_id = %patient.id, mrn = %patient.medical_record_number,
        "patient created");
    Ok(PatientCreated {
        patient,
        potential_duplicates,
    })
}

pub fn edit_patient(
    conn: &Connection,
    id: &Uuid,
    input: &PatientInput,
    now: NaiveDateTime,
) -> Result<Patient, PatientError> {
    let existing = require_patient(conn, id)?;
    let patient = Patient {
        medical_record_number: input.medical_record_number.clone(),
        first_name: input.first_name.clone(),
        last_name: input.last_name.clone(),
        preferred_name: input.preferred_name.clone(),
        date_of_birth: input.date_of_birth,
        gender: input.gender,
        email: input.email.clone(),
        phone_primary: input.phone_primary.clone(),
        phone_emergency: input.phone_emergency.clone(),
        address: input.address.clone(),
        emergency_contact_name: input.emergency_contact_name.clone(),
        emergency_contact_relation: input.emergency_contact_relation.clone(),
        emergency_contact_phone: input.emergency_contact_phone.clone(),
        insurance_provider: input.insurance_provider.clone(),
        insurance_member_id: input.insurance_member_id.clone(),
        blood_type: input.blood_type,
        updated_at: now,
        ..existing
    };
    if let Err(e) = repository::update_patient(conn, &patient) {
        if e.is_unique_violation() {
            return Err(PatientError::Validation(format!(
                "a patient with MRN '{}' already exists",
                input.medical_record_number
            )));
        }
        return Err(e.into());
    }
    Ok(patient)
}

/// Flip the active flag; returns the new value.
pub fn toggle_active(
    conn: &Connection,
    id: &Uuid,
    now: NaiveDateTime,
) -> Result<bool, PatientError> {
    let mut patient = require_patient(conn, id)?;
    patient.is_active = !patient.is_active;
    patient.updated_at = now;
    repository::update_patient(conn, &patient)?;
    Ok(patient.is_active)
}

// ═══════════════════════════════════════════
// Bulk actions
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct BulkOutcome {
    pub action: BulkAction,
    pub affected: usize,
    /// Present only for `export`.
    pub patients: Option<Vec<Patient>>,
}

/// Activate/deactivate run as one UPDATE over exactly the given ids.
/// Export reads the matched rows without mutating anything.
pub fn bulk_action(
    conn: &Connection,
    action: BulkAction,
    ids: &[Uuid],
    now: NaiveDateTime,
) -> Result<BulkOutcome, PatientError> {
    match action {
        BulkAction::Activate | BulkAction::Deactivate => {
            let active = action == BulkAction::Activate;
            let affected = repository::bulk_set_active(conn, ids, active, now)?;
            Ok(BulkOutcome {
                action,
                affected,
                patients: None,
            })
        }
        BulkAction::Export => {
            let mut patients = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(patient) = repository::get_patient(conn, id)? {
                    patients.push(patient);
                }
            }
            Ok(BulkOutcome {
                action,
                affected: patients.len(),
                patients: Some(patients),
            })
        }
    }
}

// ═══════════════════════════════════════════
// List and detail views
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct PatientListItem {
    pub patient: Patient,
    pub age: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientListData {
    pub patients: Vec<PatientListItem>,
    pub total: i64,
}

pub fn list_patients(
    conn: &Connection,
    filter: &PatientFilter,
    today: NaiveDate,
) -> Result<PatientListData, PatientError> {
    let patients = repository::list_patients(conn, filter)?;
    let total = repository::count_patients(conn, filter.is_active)?;
    Ok(PatientListData {
        patients: patients
            .into_iter()
            .map(|p| PatientListItem {
                age: p.age(today),
                patient: p,
            })
            .collect(),
        total,
    })
}

/// Everything the detail page shows, assembled in one call.
#[derive(Debug, Clone, Serialize)]
pub struct PatientDetail {
    pub patient: Patient,
    pub age: i32,
    pub bmi: Option<f64>,
    pub is_favorite: bool,
    pub allergies: Vec<Allergy>,
    pub conditions: Vec<ChronicCondition>,
    pub medications: Vec<Medication>,
    pub medical_history: Vec<MedicalHistory>,
    pub family_history: Vec<FamilyHistory>,
    pub immunizations: Vec<Immunization>,
    pub vital_signs: Vec<VitalSigns>,
    pub latest_vitals: Option<VitalSigns>,
    pub notes: Vec<PatientNote>,
}

/// Viewing a detail page also refreshes the viewer's recency marker:
/// one row per (user, patient), timestamp moved forward on repeat views.
pub fn patient_detail(
    conn: &Connection,
    id: &Uuid,
    actor: &Uuid,
    now: NaiveDateTime,
) -> Result<PatientDetail, PatientError> {
    let patient = require_patient(conn, id)?;
    repository::upsert_recent_patient(conn, actor, id, now)?;
    Ok(PatientDetail {
        age: patient.age(now.date()),
        bmi: patient.bmi(),
        is_favorite: repository::favorite_exists(conn, actor, id)?,
        allergies: repository::list_allergies(conn, id)?,
        conditions: repository::list_conditions(conn, id)?,
        medications: repository::list_medications(conn, id)?,
        medical_history: repository::list_medical_history(conn, id)?,
        family_history: repository::list_family_history(conn, id)?,
        immunizations: repository::list_immunizations(conn, id)?,
        vital_signs: repository::list_vital_signs(conn, id)?,
        latest_vitals: repository::latest_vitals(conn, id)?,
        notes: repository::list_notes(conn, id)?,
        patient,
    })
}

/// Create-or-delete pair; returns true when the patient is now favorited.
pub fn toggle_favorite(
    conn: &Connection,
    actor: &Uuid,
    patient_id: &Uuid,
    now: NaiveDateTime,
) -> Result<bool, PatientError> {
    require_patient(conn, patient_id)?;
    if repository::favorite_exists(conn, actor, patient_id)? {
        repository::delete_favorite(conn, actor, patient_id)?;
        Ok(false)
    } else {
        repository::insert_favorite(
            conn,
            &crate::models::FavoritePatient {
                id: Uuid::new_v4(),
                user_id: *actor,
                patient_id: *patient_id,
                created_at: now,
            },
        )?;
        Ok(true)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientRef {
    pub patient_id: Uuid,
    pub name: String,
    pub medical_record_number: String,
}

const RECENT_DISPLAY_LIMIT: u32 = 5;

pub fn recent_patients(conn: &Connection, actor: &Uuid) -> Result<Vec<PatientRef>, PatientError> {
    let recents = repository::list_recent_patients(conn, actor, RECENT_DISPLAY_LIMIT)?;
    let mut refs = Vec::with_capacity(recents.len());
    for recent in recents {
        if let Some(patient) = repository::get_patient(conn, &recent.patient_id)? {
            refs.push(PatientRef {
                patient_id: patient.id,
                name: patient.full_name(),
                medical_record_number: patient.medical_record_number,
            });
        }
    }
    Ok(refs)
}

pub fn favorite_patients(
    conn: &Connection,
    actor: &Uuid,
) -> Result<Vec<PatientRef>, PatientError> {
    let favorites = repository::list_favorites(conn, actor)?;
    let mut refs = Vec::with_capacity(favorites.len());
    for favorite in favorites {
        if let Some(patient) = repository::get_patient(conn, &favorite.patient_id)? {
            refs.push(PatientRef {
                patient_id: patient.id,
                name: patient.full_name(),
                medical_record_number: patient.medical_record_number,
            });
        }
    }
    Ok(refs)
}

// ═══════════════════════════════════════════
// Satellite record creation
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct AllergyInput {
    pub allergy_type: AllergyType,
    pub allergen: String,
    pub reaction: String,
    pub severity: AllergySeverity,
    pub date_identified: NaiveDate,
    pub notes: Option<String>,
}

pub fn add_allergy(
    conn: &Connection,
    patient_id: &Uuid,
    input: &AllergyInput,
) -> Result<Allergy, PatientError> {
    require_patient(conn, patient_id)?;
    let allergy = Allergy {
        id: Uuid::new_v4(),
        patient_id: *patient_id,
        allergy_type: input.allergy_type,
        allergen: input.allergen.clone(),
        reaction: input.reaction.clone(),
        severity: input.severity,
        date_identified: input.date_identified,
        notes: input.notes.clone(),
    };
    repository::insert_allergy(conn, &allergy)?;
    Ok(allergy)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionInput {
    pub condition_name: String,
    pub diagnosis_date: NaiveDate,
    pub treating_physician: Option<String>,
    pub notes: Option<String>,
}

pub fn add_condition(
    conn: &Connection,
    patient_id: &Uuid,
    input: &ConditionInput,
) -> Result<ChronicCondition, PatientError> {
    require_patient(conn, patient_id)?;
    let condition = ChronicCondition {
        id: Uuid::new_v4(),
        patient_id: *patient_id,
        condition_name: input.condition_name.clone(),
        diagnosis_date: input.diagnosis_date,
        treating_physician: input.treating_physician.clone(),
        notes: input.notes.clone(),
        is_active: true,
    };
    repository::insert_condition(conn, &condition)?;
    Ok(condition)
}

#[derive(Debug, Clone, Deserialize)]
pub struct MedicationInput {
    pub medication_name: String,
    pub dosage: String,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub prescribing_doctor: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

pub fn add_medication(
    conn: &Connection,
    patient_id: &Uuid,
    input: &MedicationInput,
) -> Result<Medication, PatientError> {
    require_patient(conn, patient_id)?;
    let medication = Medication {
        id: Uuid::new_v4(),
        patient_id: *patient_id,
        medication_name: input.medication_name.clone(),
        dosage: input.dosage.clone(),
        frequency: input.frequency,
        start_date: input.start_date,
        end_date: input.end_date,
        prescribing_doctor: input.prescribing_doctor.clone(),
        reason: input.reason.clone(),
        notes: input.notes.clone(),
        is_active: true,
    };
    repository::insert_medication(conn, &medication)?;
    Ok(medication)
}

#[derive(Debug, Clone, Deserialize)]
pub struct MedicalHistoryInput {
    pub entry_type: HistoryEntryType,
    pub description: String,
    pub date: NaiveDate,
    pub facility: Option<String>,
    pub provider: Option<String>,
    pub notes: Option<String>,
}

pub fn add_medical_history(
    conn: &Connection,
    patient_id: &Uuid,
    input: &MedicalHistoryInput,
) -> Result<MedicalHistory, PatientError> {
    require_patient(conn, patient_id)?;
    let entry = MedicalHistory {
        id: Uuid::new_v4(),
        patient_id: *patient_id,
        entry_type: input.entry_type,
        description: input.description.clone(),
        date: input.date,
        facility: input.facility.clone(),
        provider: input.provider.clone(),
        notes: input.notes.clone(),
    };
    repository::insert_medical_history(conn, &entry)?;
    Ok(entry)
}

#[derive(Debug, Clone, Deserialize)]
pub struct FamilyHistoryInput {
    pub relationship: FamilyRelationship,
    pub condition: String,
    pub age_at_diagnosis: Option<u32>,
    pub notes: Option<String>,
}

pub fn add_family_history(
    conn: &Connection,
    patient_id: &Uuid,
    input: &FamilyHistoryInput,
) -> Result<FamilyHistory, PatientError> {
    require_patient(conn, patient_id)?;
    let entry = FamilyHistory {
        id: Uuid::new_v4(),
        patient_id: *patient_id,
        relationship: input.relationship,
        condition: input.condition.clone(),
        age_at_diagnosis: input.age_at_diagnosis,
        notes: input.notes.clone(),
    };
    repository::insert_family_history(conn, &entry)?;
    Ok(entry)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImmunizationInput {
    pub vaccine_name: String,
    pub date_administered: NaiveDate,
    pub administered_by: Option<String>,
    pub lot_number: Option<String>,
    pub notes: Option<String>,
}

pub fn add_immunization(
    conn: &Connection,
    patient_id: &Uuid,
    input: &ImmunizationInput,
) -> Result<Immunization, PatientError> {
    require_patient(conn, patient_id)?;
    let immunization = Immunization {
        id: Uuid::new_v4(),
        patient_id: *patient_id,
        vaccine_name: input.vaccine_name.clone(),
        date_administered: input.date_administered,
        administered_by: input.administered_by.clone(),
        lot_number: input.lot_number.clone(),
        notes: input.notes.clone(),
    };
    repository::insert_immunization(conn, &immunization)?;
    Ok(immunization)
}

#[derive(Debug, Clone, Deserialize)]
pub struct VitalSignsInput {
    pub temperature: Option<f64>,
    pub heart_rate: Option<u32>,
    pub blood_pressure_systolic: Option<u32>,
    pub blood_pressure_diastolic: Option<u32>,
    pub respiratory_rate: Option<u32>,
    pub oxygen_saturation: Option<u32>,
    pub height_cm: Option<u32>,
    pub weight_kg: Option<f64>,
}

/// Recording vitals also refreshes the patient's denormalized
/// height/weight cache when those readings are present.
pub fn add_vital_signs(
    conn: &Connection,
    patient_id: &Uuid,
    input: &VitalSignsInput,
    actor: &Uuid,
    now: NaiveDateTime,
) -> Result<VitalSigns, PatientError> {
    require_patient(conn, patient_id)?;
    let vitals = VitalSigns {
        id: Uuid::new_v4(),
        patient_id: *patient_id,
        date_recorded: now,
        temperature: input.temperature,
        heart_rate: input.heart_rate,
        blood_pressure_systolic: input.blood_pressure_systolic,
        blood_pressure_diastolic: input.blood_pressure_diastolic,
        respiratory_rate: input.respiratory_rate,
        oxygen_saturation: input.oxygen_saturation,
        height_cm: input.height_cm,
        weight_kg: input.weight_kg,
        recorded_by: Some(*actor),
    };
    let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;
    repository::insert_vital_signs(&tx, &vitals)?;
    if input.height_cm.is_some() || input.weight_kg.is_some() {
        repository::update_patient_body_metrics(
            &tx,
            patient_id,
            input.height_cm,
            input.weight_kg,
            now,
        )?;
    }
    tx.commit().map_err(DatabaseError::from)?;
    Ok(vitals)
}

#[derive(Debug, Clone, Deserialize)]
pub struct NoteInput {
    pub note: String,
}

pub fn add_note(
    conn: &Connection,
    patient_id: &Uuid,
    input: &NoteInput,
    actor: &Uuid,
    now: NaiveDateTime,
) -> Result<PatientNote, PatientError> {
    require_patient(conn, patient_id)?;
    if input.note.trim().is_empty() {
        return Err(PatientError::Validation("note must not be empty".into()));
    }
    let note = PatientNote {
        id: Uuid::new_v4(),
        patient_id: *patient_id,
        created_by: *actor,
        created_at: now,
        updated_at: now,
        note: input.note.clone(),
    };
    repository::insert_note(conn, &note)?;
    Ok(note)
}
