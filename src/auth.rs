//! Identity and access: password hashing, bearer tokens, login/logout
//! bookkeeping, and user administration.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::NaiveDateTime;
use pbkdf2::password_hash::rand_core::OsRng;
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::Pbkdf2;
use rand::RngCore;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::enums::Role;
use crate::models::{LoginAttempt, User, UserSession};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("account is deactivated")]
    Inactive,
    #[error("{0}")]
    Validation(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("password hashing failed")]
    Hash,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl AuthError {
    fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

// ═══════════════════════════════════════════
// Passwords and tokens
// ═══════════════════════════════════════════

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Pbkdf2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| AuthError::Hash)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Pbkdf2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Opaque bearer token handed to the client. Only its hash is stored.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

// ═══════════════════════════════════════════
// Login / logout
// ═══════════════════════════════════════════

/// Client details recorded on attempts and sessions.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip_address: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub user: User,
    pub session_id: Uuid,
}

fn record_attempt(
    conn: &Connection,
    user_id: Option<Uuid>,
    email: &str,
    meta: &RequestMeta,
    now: NaiveDateTime,
    successful: bool,
) -> Result<(), DatabaseError> {
    repository::insert_login_attempt(
        conn,
        &LoginAttempt {
            id: Uuid::new_v4(),
            user_id,
            email: email.to_string(),
            ip_address: meta.ip_address.clone(),
            user_agent: meta.user_agent.clone(),
            timestamp: now,
            successful,
        },
    )
}

/// Every call records a LoginAttempt, success or not. A successful login
/// opens a session keyed by the token hash and stamps last_login.
pub fn login(
    conn: &Connection,
    email: &str,
    password: &str,
    meta: &RequestMeta,
    now: NaiveDateTime,
) -> Result<LoginOutcome, AuthError> {
    let user = match repository::get_user_by_email(conn, email)? {
        Some(user) => user,
        None => {
            record_attempt(conn, None, email, meta, now, false)?;
            return Err(AuthError::InvalidCredentials);
        }
    };
    if !verify_password(password, &user.password_hash) {
        record_attempt(conn, Some(user.id), email, meta, now, false)?;
        return Err(AuthError::InvalidCredentials);
    }
    if !user.is_active {
        record_attempt(conn, Some(user.id), email, meta, now, false)?;
        return Err(AuthError::Inactive);
    }

    record_attempt(conn, Some(user.id), email, meta, now, true)?;

    let token = generate_token();
    let session = UserSession {
        id: Uuid::new_v4(),
        user_id: user.id,
        session_key: hash_token(&token),
        ip_address: meta.ip_address.clone(),
        user_agent: meta.user_agent.clone(),
        login_time: now,
        last_activity: now,
        logged_out: false,
    };
    repository::insert_session(conn, &session)?;

    let mut user = user;
    user.last_login = Some(now);
    repository::update_user(conn, &user)?;

    tracing::info!(user_id = %user.id, "login succeeded");
    Ok(LoginOutcome {
        token,
        user,
        session_id: session.id,
    })
}

pub fn logout(conn: &Connection, session: &UserSession) -> Result<(), AuthError> {
    repository::end_session(conn, &session.id, &session.user_id)?;
    Ok(())
}

/// Resolve a bearer token to its live session, if any.
pub fn session_for_token(
    conn: &Connection,
    token: &str,
) -> Result<Option<UserSession>, AuthError> {
    Ok(repository::get_active_session(conn, &hash_token(token))?)
}

pub fn list_sessions(conn: &Connection, user_id: &Uuid) -> Result<Vec<UserSession>, AuthError> {
    Ok(repository::list_active_sessions(conn, user_id)?)
}

/// End one of the caller's own sessions (remote logout).
pub fn end_session(conn: &Connection, user_id: &Uuid, session_id: &Uuid) -> Result<(), AuthError> {
    if !repository::end_session(conn, session_id, user_id)? {
        return Err(AuthError::not_found("Session", session_id));
    }
    Ok(())
}

// ═══════════════════════════════════════════
// Password management
// ═══════════════════════════════════════════

pub fn change_password(
    conn: &Connection,
    user_id: &Uuid,
    current: &str,
    new_password: &str,
) -> Result<(), AuthError> {
    let mut user = repository::get_user(conn, user_id)?
        .ok_or_else(|| AuthError::not_found("User", user_id))?;
    if !verify_password(current, &user.password_hash) {
        return Err(AuthError::InvalidCredentials);
    }
    validate_password(new_password)?;
    user.password_hash = hash_password(new_password)?;
    repository::update_user(conn, &user)?;
    Ok(())
}

/// Self-service reset by email. Responds identically for unknown
/// addresses so the endpoint does not leak which emails exist.
pub fn reset_password(
    conn: &Connection,
    email: &str,
    new_password: &str,
) -> Result<(), AuthError> {
    validate_password(new_password)?;
    if let Some(mut user) = repository::get_user_by_email(conn, email)? {
        user.password_hash = hash_password(new_password)?;
        repository::update_user(conn, &user)?;
        tracing::info!(user_id = %user.id, "password reset");
    }
    Ok(())
}

const MIN_PASSWORD_LEN: usize = 8;

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

// ═══════════════════════════════════════════
// User administration
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct NewUserInput {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub phone_number: Option<String>,
    pub password: String,
}

pub fn create_user(
    conn: &Connection,
    input: &NewUserInput,
    now: NaiveDateTime,
) -> Result<User, AuthError> {
    if !input.email.contains('@') {
        return Err(AuthError::Validation("invalid email address".into()));
    }
    validate_password(&input.password)?;
    let user = User {
        id: Uuid::new_v4(),
        email: input.email.clone(),
        first_name: input.first_name.clone(),
        last_name: input.last_name.clone(),
        role: input.role,
        phone_number: input.phone_number.clone(),
        password_hash: hash_password(&input.password)?,
        is_active: true,
        use_dark_theme: false,
        date_joined: now,
        last_login: None,
    };
    if let Err(e) = repository::insert_user(conn, &user) {
        if e.is_unique_violation() {
            return Err(AuthError::Validation(format!(
                "a user with email '{}' already exists",
                input.email
            )));
        }
        return Err(e.into());
    }
    tracing::info!(user_id = %user.id, role = user.role.as_str(), "user created");
    Ok(user)
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserInput {
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub phone_number: Option<String>,
    pub is_active: bool,
}

pub fn update_user(
    conn: &Connection,
    user_id: &Uuid,
    input: &UpdateUserInput,
) -> Result<User, AuthError> {
    let mut user = repository::get_user(conn, user_id)?
        .ok_or_else(|| AuthError::not_found("User", user_id))?;
    user.first_name = input.first_name.clone();
    user.last_name = input.last_name.clone();
    user.role = input.role;
    user.phone_number = input.phone_number.clone();
    user.is_active = input.is_active;
    repository::update_user(conn, &user)?;
    Ok(user)
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>, AuthError> {
    Ok(repository::list_users(conn)?)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileInput {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
}

/// Self-service profile edit. Role and active flag are admin-only and
/// go through `update_user` instead.
pub fn update_profile(
    conn: &Connection,
    user_id: &Uuid,
    input: &ProfileInput,
) -> Result<User, AuthError> {
    let mut user = repository::get_user(conn, user_id)?
        .ok_or_else(|| AuthError::not_found("User", user_id))?;
    user.first_name = input.first_name.clone();
    user.last_name = input.last_name.clone();
    user.phone_number = input.phone_number.clone();
    repository::update_user(conn, &user)?;
    Ok(user)
}

/// Flip the caller's theme preference; returns the new value.
pub fn toggle_theme(conn: &Connection, user_id: &Uuid) -> Result<bool, AuthError> {
    let mut user = repository::get_user(conn, user_id)?
        .ok_or_else(|| AuthError::not_found("User", user_id))?;
    user.use_dark_theme = !user.use_dark_theme;
    repository::update_user(conn, &user)?;
    Ok(user.use_dark_theme)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn seed_user(conn: &Connection, email: &str, password: &str) -> User {
        create_user(
            conn,
            &NewUserInput {
                email: email.into(),
                first_name: "Dana".into(),
                last_name: "Reyes".into(),
                role: Role::Doctor,
                phone_number: None,
                password: password.into(),
            },
            now(),
        )
        .unwrap()
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn token_hash_is_stable_and_hex() {
        let token = generate_token();
        let h1 = hash_token(&token);
        assert_eq!(h1, hash_token(&token));
        assert_eq!(h1.len(), 64);
        assert!(h1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn login_opens_a_session_and_records_attempt() {
        let conn = open_memory_database().unwrap();
        let user = seed_user(&conn, "doc@clinic.test", "hunter2hunter2");
        let outcome = login(
            &conn,
            "doc@clinic.test",
            "hunter2hunter2",
            &RequestMeta::default(),
            now(),
        )
        .unwrap();
        assert_eq!(outcome.user.id, user.id);
        assert_eq!(outcome.user.last_login, Some(now()));

        // Stored session key is the token's hash, not the token.
        let session = session_for_token(&conn, &outcome.token).unwrap().unwrap();
        assert_eq!(session.session_key, hash_token(&outcome.token));
        assert_ne!(session.session_key, outcome.token);

        let attempts: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM login_attempts WHERE successful = 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(attempts, 1);
    }

    #[test]
    fn failed_login_still_records_an_attempt() {
        let conn = open_memory_database().unwrap();
        seed_user(&conn, "doc@clinic.test", "hunter2hunter2");
        let err = login(
            &conn,
            "doc@clinic.test",
            "nope",
            &RequestMeta::default(),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let attempts: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM login_attempts WHERE successful = 0",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(attempts, 1);
    }

    #[test]
    fn deactivated_user_cannot_login() {
        let conn = open_memory_database().unwrap();
        let user = seed_user(&conn, "doc@clinic.test", "hunter2hunter2");
        update_user(
            &conn,
            &user.id,
            &UpdateUserInput {
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                role: user.role,
                phone_number: None,
                is_active: false,
            },
        )
        .unwrap();
        let err = login(
            &conn,
            "doc@clinic.test",
            "hunter2hunter2",
            &RequestMeta::default(),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, AuthError::Inactive));
    }

    #[test]
    fn logout_invalidates_the_token() {
        let conn = open_memory_database().unwrap();
        seed_user(&conn, "doc@clinic.test", "hunter2hunter2");
        let outcome = login(
            &conn,
            "doc@clinic.test",
            "hunter2hunter2",
            &RequestMeta::default(),
            now(),
        )
        .unwrap();
        let session = session_for_token(&conn, &outcome.token).unwrap().unwrap();
        logout(&conn, &session).unwrap();
        assert!(session_for_token(&conn, &outcome.token).unwrap().is_none());
    }

    #[test]
    fn change_password_requires_the_current_one() {
        let conn = open_memory_database().unwrap();
        let user = seed_user(&conn, "doc@clinic.test", "hunter2hunter2");
        let err =
            change_password(&conn, &user.id, "wrong", "newpassword1").unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        change_password(&conn, &user.id, "hunter2hunter2", "newpassword1").unwrap();
        assert!(login(
            &conn,
            "doc@clinic.test",
            "newpassword1",
            &RequestMeta::default(),
            now()
        )
        .is_ok());
    }

    #[test]
    fn reset_password_is_silent_for_unknown_email() {
        let conn = open_memory_database().unwrap();
        assert!(reset_password(&conn, "ghost@clinic.test", "newpassword1").is_ok());
    }

    #[test]
    fn duplicate_email_is_a_validation_error() {
        let conn = open_memory_database().unwrap();
        seed_user(&conn, "doc@clinic.test", "hunter2hunter2");
        let err = create_user(
            &conn,
            &NewUserInput {
                email: "doc@clinic.test".into(),
                first_name: "Other".into(),
                last_name: "Doc".into(),
                role: Role::Nurse,
                phone_number: None,
                password: "hunter2hunter2".into(),
            },
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[test]
    fn short_password_is_rejected() {
        let conn = open_memory_database().unwrap();
        let err = create_user(
            &conn,
            &NewUserInput {
                email: "doc@clinic.test".into(),
                first_name: "Dana".into(),
                last_name: "Reyes".into(),
                role: Role::Doctor,
                phone_number: None,
                password: "short".into(),
            },
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[test]
    fn theme_toggle_flips() {
        let conn = open_memory_database().unwrap();
        let user = seed_user(&conn, "doc@clinic.test", "hunter2hunter2");
        assert!(toggle_theme(&conn, &user.id).unwrap());
        assert!(!toggle_theme(&conn, &user.id).unwrap());
    }

    #[test]
    fn profile_edit_keeps_role_and_active_flag() {
        let conn = open_memory_database().unwrap();
        let user = seed_user(&conn, "doc@clinic.test", "hunter2hunter2");
        let updated = update_profile(
            &conn,
            &user.id,
            &ProfileInput {
                first_name: "Jo".into(),
                last_name: "Meyer".into(),
                phone_number: Some("555-0102".into()),
            },
        )
        .unwrap();
        assert_eq!(updated.full_name(), "Jo Meyer");
        assert_eq!(updated.role, user.role);
        assert!(updated.is_active);
    }

    #[test]
    fn end_session_only_touches_own_sessions() {
        let conn = open_memory_database().unwrap();
        seed_user(&conn, "a@clinic.test", "hunter2hunter2");
        let other = seed_user(&conn, "b@clinic.test", "hunter2hunter2");
        let outcome = login(
            &conn,
            "a@clinic.test",
            "hunter2hunter2",
            &RequestMeta::default(),
            now(),
        )
        .unwrap();
        let err = end_session(&conn, &other.id, &outcome.session_id).unwrap_err();
        assert!(matches!(err, AuthError::NotFound { .. }));
        assert!(session_for_token(&conn, &outcome.token).unwrap().is_some());
    }
}
