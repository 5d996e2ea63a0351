use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AppointmentStatus, FollowUpPriority, Frequency, LabOrderStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentType {
    pub id: Uuid,
    pub name: String,
    pub duration_minutes: u32,
    pub description: Option<String>,
    pub default_notes: Option<String>,
    pub color_code: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub appointment_type_id: Uuid,
    pub provider_id: Uuid,
    pub start_time: NaiveDateTime,
    /// Always start_time + type.duration_minutes, recomputed on every edit.
    pub end_time: NaiveDateTime,
    pub status: AppointmentStatus,
    pub reason: String,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Appointment {
    pub fn is_past(&self, now: NaiveDateTime) -> bool {
        self.end_time < now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: Frequency,
    pub duration_days: u32,
    pub refills: u32,
    pub instructions: String,
    pub notes: Option<String>,
    pub prescribed_by: Uuid,
    pub date_prescribed: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabOrder {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub lab_name: String,
    pub description: String,
    pub status: LabOrderStatus,
    pub ordered_by: Uuid,
    pub ordered_date: NaiveDate,
    pub results_date: Option<NaiveDate>,
    pub results: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUp {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub recommended_time_frame: String,
    pub reason: String,
    pub priority: FollowUpPriority,
    pub notes: Option<String>,
    pub is_scheduled: bool,
    pub follow_up_appointment_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_past_compares_end_time() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let appt = Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            appointment_type_id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            start_time: start,
            end_time: start + chrono::Duration::minutes(30),
            status: AppointmentStatus::Scheduled,
            reason: "checkup".into(),
            notes: None,
            created_by: Uuid::new_v4(),
            created_at: start,
            updated_at: start,
        };
        assert!(!appt.is_past(start + chrono::Duration::minutes(30)));
        assert!(appt.is_past(start + chrono::Duration::minutes(31)));
    }
}
