use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::{IntoParams, ToSchema};

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::model::correction::{CorrectionRequest, CorrectionStatus};
use crate::model::division::Division;

const SELECT_CORRECTION: &str = r#"
    SELECT id, person_id, site_id, division, date, requested_check_in,
           requested_check_out, requested_shift, requested_is_overtime,
           requested_is_backup, reason, evidence_ref, status, resolved_by,
           rejection_reason, created_at
    FROM corrections
"#;

#[derive(Deserialize, ToSchema)]
pub struct SubmitCorrection {
    /// Defaults to the caller; officers may only target themselves.
    #[schema(example = 1000)]
    pub person_id: Option<i64>,
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
}

impl SubmitCorrection {
    fn has_requested_fields(&self) -> bool {
        self.requested_check_in.is_some()
            || self.requested_check_out.is_some()
            || self.requested_shift.is_some()
            || self.requested_is_overtime.is_some()
            || self.requested_is_backup.is_some()
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct CorrectionFilter {
    pub status: Option<CorrectionStatus>,
    #[schema(example = 1000)]
    pub person_id: Option<i64>,
    #[schema(example = 42)]
    pub site_id: Option<i64>,
    /// Pagination page number (1-based)
    #[schema(example = 1)]
    pub page: Option<u64>,
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct CorrectionListResponse {
    pub data: Vec<CorrectionRequest>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

pub async fn fetch(pool: &SqlitePool, id: i64) -> Result<CorrectionRequest, ApiError> {
    let sql = format!("{SELECT_CORRECTION} WHERE id = ?");
    sqlx::query_as::<_, CorrectionRequest>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::CorrectionNotFound(id))
}

pub async fn submit(
    pool: &SqlitePool,
    ctx: &RequestContext,
    payload: &SubmitCorrection,
) -> Result<CorrectionRequest, ApiError> {
    let person_id = payload.person_id.unwrap_or(ctx.person_id);
    if ctx.is_officer() && person_id != ctx.person_id {
        return Err(ApiError::Forbidden(
            "officers may only submit corrections for themselves".into(),
        ));
    }
    if !payload.has_requested_fields() {
        return Err(ApiError::EmptyRequest);
    }
    if payload.reason.trim().is_empty() {
        return Err(ApiError::EmptyReason);
    }

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO corrections (person_id, site_id, division, date, requested_check_in,
                                 requested_check_out, requested_shift, requested_is_overtime,
                                 requested_is_backup, reason, evidence_ref, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'PENDING', ?)
        "#,
    )
    .bind(person_id)
    .bind(payload.site_id)
    .bind(payload.division)
    .bind(payload.date)
    .bind(payload.requested_check_in)
    .bind(payload.requested_check_out)
    .bind(payload.requested_shift.as_deref())
    .bind(payload.requested_is_overtime)
    .bind(payload.requested_is_backup)
    .bind(payload.reason.trim())
    .bind(payload.evidence_ref.as_deref())
    .bind(Utc::now().naive_utc())
    .execute(&mut *tx)
    .await?;

    let id = result.last_insert_rowid();
    super::audit::record(
        &mut *tx,
        ctx.person_id,
        "correction.submit",
        "correction",
        id,
        None,
        Some("PENDING"),
    )
    .await?;
    tx.commit().await?;

    fetch(pool, id).await
}

/// The single multi-step atomic operation in the core: the PENDING →
/// APPROVED transition and the record mutation commit together or not at
/// all. Concurrent approvals have exactly one winner; the loser observes
/// `NotPending`.
pub async fn approve(
    pool: &SqlitePool,
    ctx: &RequestContext,
    id: i64,
    overtime_threshold_minutes: i64,
) -> Result<CorrectionRequest, ApiError> {
    let mut tx = pool.begin().await?;

    let sql = format!("{SELECT_CORRECTION} WHERE id = ?");
    let correction: CorrectionRequest = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ApiError::CorrectionNotFound(id))?;

    if correction.status != CorrectionStatus::Pending {
        return Err(ApiError::NotPending(id));
    }

    // guarded transition: rows_affected == 0 means a concurrent resolver won
    let result = sqlx::query(
        "UPDATE corrections SET status = 'APPROVED', resolved_by = ? WHERE id = ? AND status = 'PENDING'",
    )
    .bind(ctx.person_id)
    .bind(id)
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotPending(id));
    }

    let record_id =
        super::attendance::apply_correction(&mut *tx, &correction, overtime_threshold_minutes)
            .await?;

    super::audit::record(
        &mut *tx,
        ctx.person_id,
        "correction.approve",
        "correction",
        id,
        Some("PENDING"),
        Some("APPROVED"),
    )
    .await?;

    tx.commit().await?;
    tracing::info!(correction_id = id, record_id, "correction approved");

    fetch(pool, id).await
}

pub async fn reject(
    pool: &SqlitePool,
    ctx: &RequestContext,
    id: i64,
    rejection_reason: &str,
) -> Result<CorrectionRequest, ApiError> {
    if rejection_reason.trim().is_empty() {
        return Err(ApiError::EmptyRejectionReason);
    }

    let mut tx = pool.begin().await?;

    let sql = format!("{SELECT_CORRECTION} WHERE id = ?");
    let correction: CorrectionRequest = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ApiError::CorrectionNotFound(id))?;

    if correction.status != CorrectionStatus::Pending {
        return Err(ApiError::NotPending(id));
    }

    let result = sqlx::query(
        r#"
        UPDATE corrections SET status = 'REJECTED', resolved_by = ?, rejection_reason = ?
        WHERE id = ? AND status = 'PENDING'
        "#,
    )
    .bind(ctx.person_id)
    .bind(rejection_reason.trim())
    .bind(id)
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotPending(id));
    }

    super::audit::record(
        &mut *tx,
        ctx.person_id,
        "correction.reject",
        "correction",
        id,
        Some("PENDING"),
        Some("REJECTED"),
    )
    .await?;

    tx.commit().await?;
    fetch(pool, id).await
}

/// Paginated listing, newest first.
pub async fn list(
    pool: &SqlitePool,
    filter: &CorrectionFilter,
) -> Result<CorrectionListResponse, ApiError> {
    let per_page = filter.per_page.unwrap_or(10).min(100);
    // clamp before the offset multiply; a hostile page number must not wrap
    let page = filter.page.unwrap_or(1).clamp(1, u32::MAX as u64);
    let offset = (page - 1) * per_page;

    // Helper enum for typed SQLx binding of the dynamic WHERE clause
    enum FilterValue {
        I64(i64),
        Text(&'static str),
    }

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(status) = filter.status {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Text(match status {
            CorrectionStatus::Pending => "PENDING",
            CorrectionStatus::Approved => "APPROVED",
            CorrectionStatus::Rejected => "REJECTED",
        }));
    }
    if let Some(person_id) = filter.person_id {
        where_sql.push_str(" AND person_id = ?");
        args.push(FilterValue::I64(person_id));
    }
    if let Some(site_id) = filter.site_id {
        where_sql.push_str(" AND site_id = ?");
        args.push(FilterValue::I64(site_id));
    }

    let count_sql = format!("SELECT COUNT(*) FROM corrections{where_sql}");
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::I64(v) => count_q.bind(*v),
            FilterValue::Text(s) => count_q.bind(*s),
        };
    }
    let total = count_q.fetch_one(pool).await?;

    let data_sql =
        format!("{SELECT_CORRECTION}{where_sql} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?");
    let mut data_q = sqlx::query_as::<_, CorrectionRequest>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::I64(v) => data_q.bind(v),
            FilterValue::Text(s) => data_q.bind(s),
        };
    }
    let data = data_q
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool)
        .await?;

    Ok(CorrectionListResponse {
        data,
        page: page as u32,
        per_page: per_page as u32,
        total,
    })
}
