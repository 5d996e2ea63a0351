use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{
    AllergySeverity, AllergyType, BloodType, FamilyRelationship, Frequency, Gender,
    HistoryEntryType,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
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
    /// Denormalized cache of the most recent vitals measurement.
    pub height_cm: Option<u32>,
    pub weight_kg: Option<f64>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Whole years as of `today`. Derived, never stored.
    pub fn age(&self, today: NaiveDate) -> i32 {
        let dob = self.date_of_birth;
        let mut age = today.year() - dob.year();
        if (today.month(), today.day()) < (dob.month(), dob.day()) {
            age -= 1;
        }
        age
    }

    /// BMI from the cached height/weight, rounded to two decimals.
    pub fn bmi(&self) -> Option<f64> {
        bmi_from(self.height_cm, self.weight_kg)
    }
}

pub(crate) fn bmi_from(height_cm: Option<u32>, weight_kg: Option<f64>) -> Option<f64> {
    match (height_cm, weight_kg) {
        (Some(h), Some(w)) if h > 0 => {
            let height_m = h as f64 / 100.0;
            Some((w / (height_m * height_m) * 100.0).round() / 100.0)
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allergy {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub allergy_type: AllergyType,
    pub allergen: String,
    pub reaction: String,
    pub severity: AllergySeverity,
    pub date_identified: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChronicCondition {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub condition_name: String,
    pub diagnosis_date: NaiveDate,
    pub treating_physician: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
}

/// Patient-level medication. Also the mirror target for prescriptions
/// attached to appointments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub prescribing_doctor: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalHistory {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub entry_type: HistoryEntryType,
    pub description: String,
    pub date: NaiveDate,
    pub facility: Option<String>,
    pub provider: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyHistory {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub relationship: FamilyRelationship,
    pub condition: String,
    pub age_at_diagnosis: Option<u32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Immunization {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub vaccine_name: String,
    pub date_administered: NaiveDate,
    pub administered_by: Option<String>,
    pub lot_number: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalSigns {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub date_recorded: NaiveDateTime,
    pub temperature: Option<f64>,
    pub heart_rate: Option<u32>,
    pub blood_pressure_systolic: Option<u32>,
    pub blood_pressure_diastolic: Option<u32>,
    pub respiratory_rate: Option<u32>,
    pub oxygen_saturation: Option<u32>,
    pub height_cm: Option<u32>,
    pub weight_kg: Option<f64>,
    pub recorded_by: Option<Uuid>,
}

impl VitalSigns {
    /// "120/80" style display, None unless both readings exist.
    pub fn blood_pressure(&self) -> Option<String> {
        match (self.blood_pressure_systolic, self.blood_pressure_diastolic) {
            (Some(sys), Some(dia)) => Some(format!("{sys}/{dia}")),
            _ => None,
        }
    }

    pub fn bmi(&self) -> Option<f64> {
        bmi_from(self.height_cm, self.weight_kg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientNote {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub created_by: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub note: String,
}

/// Per-user recency marker, unique on (user, patient).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentPatient {
    pub id: Uuid,
    pub user_id: Uuid,
    pub patient_id: Uuid,
    pub last_viewed: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoritePatient {
    pub id: Uuid,
    pub user_id: Uuid,
    pub patient_id: Uuid,
    pub created_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(dob: NaiveDate) -> Patient {
        Patient {
            id: Uuid::new_v4(),
            medical_record_number: Uuid::new_v4().to_string(),
            first_name: "Test".into(),
            last_name: "Patient".into(),
            preferred_name: None,
            date_of_birth: dob,
            gender: Gender::Female,
            email: None,
            phone_primary: "555-0100".into(),
            phone_emergency: None,
            address: "1 Main St".into(),
            emergency_contact_name: "Kin".into(),
            emergency_contact_relation: "parent".into(),
            emergency_contact_phone: "555-0101".into(),
            insurance_provider: None,
            insurance_member_id: None,
            blood_type: BloodType::Unknown,
            height_cm: None,
            weight_kg: None,
            is_active: true,
            created_at: dob.and_hms_opt(0, 0, 0).unwrap(),
            updated_at: dob.and_hms_opt(0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn age_before_and_after_birthday() {
        let p = patient(NaiveDate::from_ymd_opt(1990, 6, 15).unwrap());
        assert_eq!(p.age(NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()), 33);
        assert_eq!(p.age(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()), 34);
        assert_eq!(p.age(NaiveDate::from_ymd_opt(2024, 6, 16).unwrap()), 34);
    }

    #[test]
    fn bmi_requires_both_measurements() {
        let mut p = patient(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap());
        assert_eq!(p.bmi(), None);
        p.height_cm = Some(180);
        assert_eq!(p.bmi(), None);
        p.weight_kg = Some(81.0);
        assert_eq!(p.bmi(), Some(25.0));
    }

    #[test]
    fn blood_pressure_display() {
        let vitals = VitalSigns {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            date_recorded: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            temperature: None,
            heart_rate: None,
            blood_pressure_systolic: Some(120),
            blood_pressure_diastolic: Some(80),
            respiratory_rate: None,
            oxygen_saturation: None,
            height_cm: None,
            weight_kg: None,
            recorded_by: None,
        };
        assert_eq!(vitals.blood_pressure().as_deref(), Some("120/80"));
    }
}
