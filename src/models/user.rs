use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub phone_number: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub use_dark_theme: bool,
    pub date_joined: NaiveDateTime,
    pub last_login: Option<NaiveDateTime>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// One row per login attempt, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginAttempt {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: String,
    pub ip_address: String,
    pub user_agent: String,
    pub timestamp: NaiveDateTime,
    pub successful: bool,
}

/// A bearer-token session. `session_key` holds the SHA-256 of the
/// token; the token itself is returned to the client once at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSession {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing)]
    pub session_key: String,
    pub ip_address: String,
    pub user_agent: String,
    pub login_time: NaiveDateTime,
    pub last_activity: NaiveDateTime,
    pub logged_out: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_joins_parts() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@clinic.test".into(),
            first_name: "Ada".into(),
            last_name: "Wong".into(),
            role: Role::Doctor,
            phone_number: None,
            password_hash: "x".into(),
            is_active: true,
            use_dark_theme: false,
            date_joined: chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            last_login: None,
        };
        assert_eq!(user.full_name(), "Ada Wong");
    }

    #[test]
    fn password_hash_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@clinic.test".into(),
            first_name: "Ada".into(),
            last_name: "Wong".into(),
            role: Role::Admin,
            phone_number: None,
            password_hash: "secret".into(),
            is_active: true,
            use_dark_theme: false,
            date_joined: chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            last_login: None,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("password_hash"));
    }
}
