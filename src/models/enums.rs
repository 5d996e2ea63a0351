use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Serde uses the same strings as the database column values.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Role {
    Admin => "admin",
    Doctor => "doctor",
    Nurse => "nurse",
    Staff => "staff",
});

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Doctors, nurses and staff; admins pass the same gate.
    pub fn is_medical_staff(&self) -> bool {
        matches!(self, Role::Doctor | Role::Nurse | Role::Staff | Role::Admin)
    }
}

str_enum!(Gender {
    Male => "M",
    Female => "F",
    Other => "O",
});

str_enum!(BloodType {
    APositive => "A+",
    ANegative => "A-",
    BPositive => "B+",
    BNegative => "B-",
    AbPositive => "AB+",
    AbNegative => "AB-",
    OPositive => "O+",
    ONegative => "O-",
    Unknown => "unknown",
});

str_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Confirmed => "confirmed",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
    NoShow => "no_show",
});

str_enum!(LabOrderStatus {
    Ordered => "ordered",
    Collected => "collected",
    InProcess => "in_process",
    Completed => "completed",
    Cancelled => "cancelled",
});

str_enum!(FollowUpPriority {
    Low => "low",
    Medium => "medium",
    High => "high",
});

str_enum!(Frequency {
    OnceDaily => "once_daily",
    TwiceDaily => "twice_daily",
    ThreeTimesDaily => "three_times_daily",
    FourTimesDaily => "four_times_daily",
    AsNeeded => "as_needed",
    Other => "other",
});

str_enum!(AllergyType {
    Medication => "medication",
    Food => "food",
    Environmental => "environmental",
    Other => "other",
});

str_enum!(AllergySeverity {
    Mild => "mild",
    Moderate => "moderate",
    Severe => "severe",
    LifeThreatening => "life_threatening",
});

str_enum!(HistoryEntryType {
    Surgery => "surgery",
    Hospitalization => "hospitalization",
    Procedure => "procedure",
    Illness => "illness",
    Other => "other",
});

str_enum!(FamilyRelationship {
    Mother => "mother",
    Father => "father",
    Sister => "sister",
    Brother => "brother",
    GrandmotherMaternal => "grandmother_maternal",
    GrandmotherPaternal => "grandmother_paternal",
    GrandfatherMaternal => "grandfather_maternal",
    GrandfatherPaternal => "grandfather_paternal",
    Aunt => "aunt",
    Uncle => "uncle",
    Other => "other",
});

str_enum!(BulkAction {
    Activate => "activate",
    Deactivate => "deactivate",
    Export => "export",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn appointment_status_round_trip() {
        for (variant, s) in [
            (AppointmentStatus::Scheduled, "scheduled"),
            (AppointmentStatus::Confirmed, "confirmed"),
            (AppointmentStatus::InProgress, "in_progress"),
            (AppointmentStatus::Completed, "completed"),
            (AppointmentStatus::Cancelled, "cancelled"),
            (AppointmentStatus::NoShow, "no_show"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(AppointmentStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn lab_order_status_round_trip() {
        for (variant, s) in [
            (LabOrderStatus::Ordered, "ordered"),
            (LabOrderStatus::Collected, "collected"),
            (LabOrderStatus::InProcess, "in_process"),
            (LabOrderStatus::Completed, "completed"),
            (LabOrderStatus::Cancelled, "cancelled"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(LabOrderStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn role_gates() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::Doctor.is_admin());
        assert!(Role::Doctor.is_medical_staff());
        assert!(Role::Nurse.is_medical_staff());
        assert!(Role::Staff.is_medical_staff());
        // Admins pass the medical staff gate too
        assert!(Role::Admin.is_medical_staff());
    }

    #[test]
    fn enum_serde_uses_wire_strings() {
        let json = serde_json::to_string(&AppointmentStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let back: AppointmentStatus = serde_json::from_str("\"no_show\"").unwrap();
        assert_eq!(back, AppointmentStatus::NoShow);
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(AppointmentStatus::from_str("finished").is_err());
        assert!(Role::from_str("superuser").is_err());
        assert!(BloodType::from_str("").is_err());
        assert!(BulkAction::from_str("delete").is_err());
    }
}
