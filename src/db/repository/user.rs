use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::Role;
use crate::models::{LoginAttempt, User, UserSession};

pub fn insert_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, email, first_name, last_name, role, phone_number,
         password_hash, is_active, use_dark_theme, date_joined, last_login)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            user.id.to_string(),
            user.email,
            user.first_name,
            user.last_name,
            user.role.as_str(),
            user.phone_number,
            user.password_hash,
            user.is_active as i32,
            user.use_dark_theme as i32,
            user.date_joined.to_string(),
            user.last_login.map(|t| t.to_string()),
        ],
    )?;
    Ok(())
}

const USER_COLUMNS: &str = "id, email, first_name, last_name, role, phone_number,
    password_hash, is_active, use_dark_theme, date_joined, last_login";

struct UserRow {
    id: String,
    email: String,
    first_name: String,
    last_name: String,
    role: String,
    phone_number: Option<String>,
    password_hash: String,
    is_active: i32,
    use_dark_theme: i32,
    date_joined: String,
    last_login: Option<String>,
}

fn user_row(row: &rusqlite::Row<'_>) -> Result<UserRow, rusqlite::Error> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        role: row.get(4)?,
        phone_number: row.get(5)?,
        password_hash: row.get(6)?,
        is_active: row.get(7)?,
        use_dark_theme: row.get(8)?,
        date_joined: row.get(9)?,
        last_login: row.get(10)?,
    })
}

fn user_from_row(row: UserRow) -> Result<User, DatabaseError> {
    Ok(User {
        id: parse_uuid(&row.id)?,
        email: row.email,
        first_name: row.first_name,
        last_name: row.last_name,
        role: Role::from_str(&row.role)?,
        phone_number: row.phone_number,
        password_hash: row.password_hash,
        is_active: row.is_active != 0,
        use_dark_theme: row.use_dark_theme != 0,
        date_joined: parse_datetime(&row.date_joined)?,
        last_login: row.last_login.and_then(|t| parse_datetime(&t).ok()),
    })
}

pub fn get_user(conn: &Connection, id: &Uuid) -> Result<Option<User>, DatabaseError> {
    let mut stmt =
        conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;
    let result = stmt.query_row(params![id.to_string()], user_row);
    match result {
        Ok(row) => Ok(Some(user_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER(?1)"
    ))?;
    let result = stmt.query_row(params![email], user_row);
    match result {
        Ok(row) => Ok(Some(user_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY last_name, first_name"
    ))?;
    let rows = stmt.query_map([], user_row)?;
    let mut users = Vec::new();
    for row in rows {
        users.push(user_from_row(row?)?);
    }
    Ok(users)
}

/// Full-row update; the id never changes.
pub fn update_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET email = ?2, first_name = ?3, last_name = ?4, role = ?5,
         phone_number = ?6, password_hash = ?7, is_active = ?8, use_dark_theme = ?9,
         last_login = ?10
         WHERE id = ?1",
        params![
            user.id.to_string(),
            user.email,
            user.first_name,
            user.last_name,
            user.role.as_str(),
            user.phone_number,
            user.password_hash,
            user.is_active as i32,
            user.use_dark_theme as i32,
            user.last_login.map(|t| t.to_string()),
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("User", user.id));
    }
    Ok(())
}

pub fn insert_login_attempt(conn: &Connection, attempt: &LoginAttempt) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO login_attempts (id, user_id, email, ip_address, user_agent, timestamp, successful)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            attempt.id.to_string(),
            attempt.user_id.map(|id| id.to_string()),
            attempt.email,
            attempt.ip_address,
            attempt.user_agent,
            attempt.timestamp.to_string(),
            attempt.successful as i32,
        ],
    )?;
    Ok(())
}

pub fn insert_session(conn: &Connection, session: &UserSession) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO user_sessions (id, user_id, session_key, ip_address, user_agent,
         login_time, last_activity, logged_out)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            session.id.to_string(),
            session.user_id.to_string(),
            session.session_key,
            session.ip_address,
            session.user_agent,
            session.login_time.to_string(),
            session.last_activity.to_string(),
            session.logged_out as i32,
        ],
    )?;
    Ok(())
}

const SESSION_COLUMNS: &str =
    "id, user_id, session_key, ip_address, user_agent, login_time, last_activity, logged_out";

fn session_from_row(row: &rusqlite::Row<'_>) -> Result<(String, String, String, String, String, String, String, i32), rusqlite::Error> {
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

fn session_from_tuple(
    t: (String, String, String, String, String, String, String, i32),
) -> Result<UserSession, DatabaseError> {
    let (id, user_id, session_key, ip_address, user_agent, login_time, last_activity, logged_out) = t;
    Ok(UserSession {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        session_key,
        ip_address,
        user_agent,
        login_time: parse_datetime(&login_time)?,
        last_activity: parse_datetime(&last_activity)?,
        logged_out: logged_out != 0,
    })
}

/// Look up a live session by token hash.
pub fn get_active_session(
    conn: &Connection,
    session_key: &str,
) -> Result<Option<UserSession>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM user_sessions
         WHERE session_key = ?1 AND logged_out = 0"
    ))?;
    let result = stmt.query_row(params![session_key], session_from_row);
    match result {
        Ok(t) => Ok(Some(session_from_tuple(t)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Refresh a session's last_activity stamp.
pub fn touch_session(
    conn: &Connection,
    id: &Uuid,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE user_sessions SET last_activity = ?2 WHERE id = ?1",
        params![id.to_string(), now.to_string()],
    )?;
    Ok(())
}

pub fn list_active_sessions(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Vec<UserSession>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM user_sessions
         WHERE user_id = ?1 AND logged_out = 0
         ORDER BY last_activity DESC"
    ))?;
    let rows = stmt.query_map(params![user_id.to_string()], session_from_row)?;
    let mut sessions = Vec::new();
    for row in rows {
        sessions.push(session_from_tuple(row?)?);
    }
    Ok(sessions)
}

/// Mark one of the user's own sessions as logged out.
/// Returns false when no matching live session exists.
pub fn end_session(
    conn: &Connection,
    id: &Uuid,
    user_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE user_sessions SET logged_out = 1
         WHERE id = ?1 AND user_id = ?2 AND logged_out = 0",
        params![id.to_string(), user_id.to_string()],
    )?;
    Ok(changed > 0)
}
