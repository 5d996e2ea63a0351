pub mod appointments;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod patients;

use chrono::{Local, NaiveDate, NaiveDateTime};

pub(crate) fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}
