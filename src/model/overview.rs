use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use super::division::Division;

/// Per-division join of planned slots against actual records for one day.
/// Computed on demand, never persisted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
pub struct DivisionAttendanceSnapshot {
    /// IN_PROGRESS + COMPLETED records for the day.
    pub on_duty: i64,
    /// ASSIGNED slots for the day.
    pub expected: i64,
    /// Matched records whose check-in exceeded start + grace window.
    pub late: i64,
    /// ASSIGNED slots with no matching record once the slot has ended.
    pub no_show: i64,
    pub overtime: i64,
    pub total: i64,
}

/// Checklist completion owned by the external task collaborator; absent
/// rows degrade to zeros.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
pub struct DivisionTaskCompletion {
    pub completed: i64,
    pub total: i64,
    pub missed: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DivisionOverview {
    pub division: Division,
    pub attendance: DivisionAttendanceSnapshot,
    pub tasks: DivisionTaskCompletion,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Overview {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub site_id: Option<i64>,
    pub divisions: Vec<DivisionOverview>,
}

/// Scheduled vs. active headcount per area (site zone or vehicle).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ManpowerRow {
    #[schema(example = 42)]
    pub site_id: i64,
    #[schema(example = "gate-3")]
    pub area: Option<String>,
    pub scheduled_manpower: i64,
    pub active_manpower: i64,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum KpiKind {
    Patrol,
    Report,
    Training,
    Cctv,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KpiRate {
    pub kind: KpiKind,
    #[schema(value_type = String, format = "date")]
    pub from: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub to: NaiveDate,
    pub site_id: Option<i64>,
    pub numerator: i64,
    pub denominator: i64,
    /// numerator / denominator * 100; defined as 0 when the denominator
    /// is 0 so dashboards always render.
    pub rate: f64,
}
