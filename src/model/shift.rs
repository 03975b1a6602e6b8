use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::division::Division;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum SlotStatus {
    Assigned,
    Open,
    Completed,
    Cancelled,
}

impl SlotStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SlotStatus::Completed | SlotStatus::Cancelled)
    }
}

/// A planned duty slot. ASSIGNED requires a person; clearing the person
/// forces OPEN. Independent of actual attendance until reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ShiftSlot {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = 42)]
    pub site_id: i64,
    pub division: Division,
    /// External zone/vehicle reference used by manpower grouping.
    #[schema(example = "gate-3")]
    pub area: Option<String>,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = String, example = "08:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "16:00:00")]
    pub end_time: NaiveTime,
    pub person_id: Option<i64>,
    pub status: SlotStatus,
}

impl ShiftSlot {
    /// Half-open [start, end) interval intersection.
    pub fn overlaps(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.start_time < end && start < self.end_time
    }
}
