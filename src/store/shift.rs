use std::collections::BTreeMap;

use chrono::{Days, Months, NaiveDate, NaiveTime};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::model::division::Division;
use crate::model::shift::{ShiftSlot, SlotStatus};

const SELECT_SLOT: &str = r#"
    SELECT id, site_id, division, area, date, start_time, end_time, person_id, status
    FROM shift_slots
"#;

#[derive(Deserialize, ToSchema)]
pub struct CreateSlot {
    #[schema(example = 42)]
    pub site_id: i64,
    pub division: Division,
    #[schema(example = "gate-3")]
    pub area: Option<String>,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = String, example = "08:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "16:00:00")]
    pub end_time: NaiveTime,
    /// Omit for an OPEN (vacant) slot.
    #[schema(example = 1000)]
    pub person_id: Option<i64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct SlotRangeFilter {
    #[schema(example = 42)]
    pub site_id: Option<i64>,
    pub division: Option<Division>,
    #[param(value_type = String)]
    #[schema(value_type = String, format = "date")]
    pub start: NaiveDate,
    #[param(value_type = String)]
    #[schema(value_type = String, format = "date")]
    pub end: NaiveDate,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct CalendarFilter {
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 3)]
    pub month: u32,
    #[schema(example = 42)]
    pub site_id: Option<i64>,
    pub division: Option<Division>,
}

pub async fn fetch(pool: &SqlitePool, id: i64) -> Result<ShiftSlot, ApiError> {
    let sql = format!("{SELECT_SLOT} WHERE id = ?");
    sqlx::query_as::<_, ShiftSlot>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::SlotNotFound(id))
}

/// No double-booking: across all sites and divisions, a person's ASSIGNED
/// slots on one date must not overlap in time.
async fn check_overlap(
    conn: &mut SqliteConnection,
    person_id: i64,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    exclude_slot: Option<i64>,
) -> Result<(), ApiError> {
    let sql = format!("{SELECT_SLOT} WHERE person_id = ? AND date = ? AND status = 'ASSIGNED'");
    let assigned: Vec<ShiftSlot> = sqlx::query_as(&sql)
        .bind(person_id)
        .bind(date)
        .fetch_all(&mut *conn)
        .await?;

    for slot in assigned {
        if exclude_slot == Some(slot.id) {
            continue;
        }
        if slot.overlaps(start, end) {
            return Err(ApiError::OverlapConflict(person_id));
        }
    }
    Ok(())
}

pub async fn create_slot(pool: &SqlitePool, payload: &CreateSlot) -> Result<ShiftSlot, ApiError> {
    if payload.end_time <= payload.start_time {
        return Err(ApiError::InvalidOrdering);
    }

    let mut tx = pool.begin().await?;

    if let Some(person_id) = payload.person_id {
        check_overlap(
            &mut tx,
            person_id,
            payload.date,
            payload.start_time,
            payload.end_time,
            None,
        )
        .await?;
    }

    let status = if payload.person_id.is_some() {
        SlotStatus::Assigned
    } else {
        SlotStatus::Open
    };

    let result = sqlx::query(
        r#"
        INSERT INTO shift_slots (site_id, division, area, date, start_time, end_time, person_id, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.site_id)
    .bind(payload.division)
    .bind(payload.area.as_deref())
    .bind(payload.date)
    .bind(payload.start_time)
    .bind(payload.end_time)
    .bind(payload.person_id)
    .bind(status)
    .execute(&mut *tx)
    .await?;

    let id = result.last_insert_rowid();
    tx.commit().await?;
    fetch(pool, id).await
}

/// Bind or vacate a slot. Clearing the person forces OPEN; binding one
/// forces ASSIGNED, subject to the overlap invariant.
pub async fn assign_person(
    pool: &SqlitePool,
    slot_id: i64,
    person_id: Option<i64>,
) -> Result<ShiftSlot, ApiError> {
    let mut tx = pool.begin().await?;

    let sql = format!("{SELECT_SLOT} WHERE id = ?");
    let slot: ShiftSlot = sqlx::query_as(&sql)
        .bind(slot_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ApiError::SlotNotFound(slot_id))?;

    if slot.status.is_terminal() {
        return Err(ApiError::SlotTerminal(slot_id));
    }

    let status = match person_id {
        Some(person_id) => {
            check_overlap(
                &mut tx,
                person_id,
                slot.date,
                slot.start_time,
                slot.end_time,
                Some(slot.id),
            )
            .await?;
            SlotStatus::Assigned
        }
        None => SlotStatus::Open,
    };

    sqlx::query("UPDATE shift_slots SET person_id = ?, status = ? WHERE id = ?")
        .bind(person_id)
        .bind(status)
        .bind(slot_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    fetch(pool, slot_id).await
}

/// Only the terminal statuses are settable explicitly; ASSIGNED/OPEN are
/// always derived from the person binding.
pub async fn set_status(
    pool: &SqlitePool,
    slot_id: i64,
    status: SlotStatus,
) -> Result<ShiftSlot, ApiError> {
    if !status.is_terminal() {
        return Err(ApiError::InvalidTransition(
            "only COMPLETED or CANCELLED can be set explicitly".into(),
        ));
    }

    let mut tx = pool.begin().await?;

    let sql = format!("{SELECT_SLOT} WHERE id = ?");
    let slot: ShiftSlot = sqlx::query_as(&sql)
        .bind(slot_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ApiError::SlotNotFound(slot_id))?;

    if slot.status.is_terminal() {
        return Err(ApiError::InvalidTransition(format!(
            "slot {slot_id} already holds a terminal status"
        )));
    }

    sqlx::query("UPDATE shift_slots SET status = ? WHERE id = ?")
        .bind(status)
        .bind(slot_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    fetch(pool, slot_id).await
}

/// Calendar range query, inclusive on both ends.
pub async fn list_range(
    pool: &SqlitePool,
    site_id: Option<i64>,
    division: Option<Division>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<ShiftSlot>, ApiError> {
    if end < start {
        return Err(ApiError::InvalidFilter(
            "end date must not precede start date".into(),
        ));
    }

    let mut sql = format!("{SELECT_SLOT} WHERE date >= ? AND date <= ?");
    if site_id.is_some() {
        sql.push_str(" AND site_id = ?");
    }
    if division.is_some() {
        sql.push_str(" AND division = ?");
    }
    sql.push_str(" ORDER BY date, start_time, id");

    let mut query = sqlx::query_as::<_, ShiftSlot>(&sql).bind(start).bind(end);
    if let Some(site_id) = site_id {
        query = query.bind(site_id);
    }
    if let Some(division) = division {
        query = query.bind(division);
    }

    Ok(query.fetch_all(pool).await?)
}

/// One month of slots grouped by date, for calendar rendering.
pub async fn list_for_month(
    pool: &SqlitePool,
    site_id: Option<i64>,
    division: Option<Division>,
    year: i32,
    month: u32,
) -> Result<BTreeMap<NaiveDate, Vec<ShiftSlot>>, ApiError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| ApiError::InvalidFilter(format!("invalid year/month {year}-{month}")))?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .ok_or_else(|| ApiError::InvalidFilter(format!("invalid year/month {year}-{month}")))?;

    let slots = list_range(pool, site_id, division, first, last).await?;

    let mut grouped: BTreeMap<NaiveDate, Vec<ShiftSlot>> = BTreeMap::new();
    for slot in slots {
        grouped.entry(slot.date).or_default().push(slot);
    }
    Ok(grouped)
}
