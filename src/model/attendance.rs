use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::division::Division;

/// Derived from the nullable check-out, never stored as a column.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, sqlx::Type, ToSchema)]
pub enum AttendanceStatus {
    #[serde(rename = "IN_PROGRESS")]
    #[sqlx(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETED")]
    #[sqlx(rename = "COMPLETED")]
    Completed,
}

/// Opaque device evidence attached to a check-in. `gps_valid` stays NULL
/// when the device did not evaluate the fix.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Evidence {
    #[schema(example = 23.7808)]
    pub lat: Option<f64>,
    #[schema(example = 90.4217)]
    pub lng: Option<f64>,
    pub gps_valid: Option<bool>,
    /// Reference into the external photo store.
    pub photo_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = 1000)]
    pub person_id: i64,
    #[schema(example = 42)]
    pub site_id: i64,
    pub division: Division,
    #[schema(value_type = String, format = "date-time")]
    pub check_in: NaiveDateTime,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out: Option<NaiveDateTime>,
    #[schema(example = "night")]
    pub shift: Option<String>,
    pub is_overtime: bool,
    pub is_backup: bool,
    pub gps_valid: Option<bool>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub photo_ref: Option<String>,
    /// Derived in the SELECT from `photo_ref`.
    pub photo_evidence: bool,
    /// Derived in the SELECT from the nullable check-out.
    pub status: AttendanceStatus,
    /// Marker of the last applied correction; guards replays.
    pub correction_id: Option<i64>,
}

impl AttendanceRecord {
    /// Minutes between check-in and check-out, once closed.
    pub fn worked_minutes(&self) -> Option<i64> {
        self.check_out.map(|out| (out - self.check_in).num_minutes())
    }
}
