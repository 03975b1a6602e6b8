use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::division::Division;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum CorrectionStatus {
    Pending,
    Approved,
    Rejected,
}

/// A supervisor-mediated proposed edit to attendance data. Targets a
/// person + date, not a record id: the record may not exist yet
/// ("missing check-in"). Terminal once resolved, never re-opened.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct CorrectionRequest {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = 1000)]
    pub person_id: i64,
    #[schema(example = 42)]
    pub site_id: i64,
    pub division: Division,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub requested_check_in: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub requested_check_out: Option<NaiveDateTime>,
    pub requested_shift: Option<String>,
    pub requested_is_overtime: Option<bool>,
    pub requested_is_backup: Option<bool>,
    #[schema(example = "extended coverage")]
    pub reason: String,
    pub evidence_ref: Option<String>,
    pub status: CorrectionStatus,
    pub resolved_by: Option<i64>,
    pub rejection_reason: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}
