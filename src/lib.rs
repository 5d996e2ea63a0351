//! CliniDesk — clinic management backend.
//!
//! Layers, bottom up: `db` (SQLite schema + repositories), `models`
//! (entities and enums), the service modules (`patients`,
//! `appointments`, `dashboard`, `auth`), and `api` (axum JSON surface).

pub mod api;
pub mod appointments;
pub mod auth;
pub mod config;
pub mod core_state;
pub mod dashboard;
pub mod db;
pub mod models;
pub mod patients;
