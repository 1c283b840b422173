#![allow(dead_code)]

pub mod temp_db;

use chrono::{DateTime, TimeZone, Utc};

/// Fixed reference instant so windows in assertions are exact.
pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0)
        .single()
        .expect("valid instant")
}
