use actix_web::{HttpResponse, web};
use chrono::{NaiveDateTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::config::Config;
use crate::context::RequestContext;
use crate::error::ApiError;
use crate::model::attendance::{AttendanceRecord, Evidence};
use crate::model::division::Division;
use crate::store::attendance;
use crate::store::attendance::{AttendanceFilter, AttendanceListResponse, AttendancePatch};

#[derive(Deserialize, ToSchema)]
pub struct CheckInRequest {
    #[schema(example = 42)]
    pub site_id: i64,
    pub division: Division,
    /// Defaults to the server clock when omitted.
    #[schema(value_type = Option<String>, format = "date-time")]
    pub time: Option<NaiveDateTime>,
    #[schema(example = "day")]
    pub shift: Option<String>,
    pub evidence: Option<Evidence>,
}

#[derive(Deserialize, ToSchema)]
pub struct CheckOutRequest {
    #[schema(example = 1)]
    pub record_id: i64,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub time: Option<NaiveDateTime>,
}

/// Check-in endpoint. The person is the authenticated caller.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    request_body = CheckInRequest,
    responses(
        (status = 200, description = "Checked in successfully", body = AttendanceRecord),
        (status = 401, description = "Missing identity headers"),
        (status = 409, description = "Already has an open record", body = Object, example = json!({
            "kind": "DUPLICATE_OPEN_RECORD",
            "detail": "person 1000 already has an open attendance record at site 42"
        }))
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    ctx: RequestContext,
    pool: web::Data<SqlitePool>,
    payload: web::Json<CheckInRequest>,
) -> Result<HttpResponse, ApiError> {
    let time = payload.time.unwrap_or_else(|| Utc::now().naive_utc());
    let evidence = payload.evidence.clone().unwrap_or_default();

    let record = attendance::check_in(
        &pool,
        ctx.person_id,
        payload.site_id,
        payload.division,
        time,
        payload.shift.as_deref(),
        &evidence,
    )
    .await?;

    tracing::info!(record_id = record.id, person_id = ctx.person_id, "checked in");
    Ok(HttpResponse::Ok().json(record))
}

/// Check-out endpoint. Officers may only close their own records.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-out",
    request_body = CheckOutRequest,
    responses(
        (status = 200, description = "Checked out successfully", body = AttendanceRecord),
        (status = 400, description = "Check-out not after check-in"),
        (status = 404, description = "Record not found"),
        (status = 409, description = "Record already closed")
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    ctx: RequestContext,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    payload: web::Json<CheckOutRequest>,
) -> Result<HttpResponse, ApiError> {
    let record = attendance::fetch(&pool, payload.record_id).await?;
    if ctx.is_officer() && record.person_id != ctx.person_id {
        return Err(ApiError::Forbidden(
            "officers may only check out their own records".into(),
        ));
    }

    let time = payload.time.unwrap_or_else(|| Utc::now().naive_utc());
    let record = attendance::check_out(
        &pool,
        payload.record_id,
        time,
        config.overtime_threshold_minutes,
    )
    .await?;

    tracing::info!(record_id = record.id, person_id = record.person_id, "checked out");
    Ok(HttpResponse::Ok().json(record))
}

/// Supervisor direct edit; bypasses the correction workflow.
#[utoipa::path(
    patch,
    path = "/api/v1/attendance/{id}",
    request_body = AttendancePatch,
    params(("id" = i64, Path, description = "Attendance record id")),
    responses(
        (status = 200, description = "Record updated", body = AttendanceRecord),
        (status = 400, description = "Check-out not after check-in"),
        (status = 403, description = "Supervisor/Admin only"),
        (status = 404, description = "Record not found")
    ),
    tag = "Attendance"
)]
pub async fn patch_attendance(
    ctx: RequestContext,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    path: web::Path<i64>,
    payload: web::Json<AttendancePatch>,
) -> Result<HttpResponse, ApiError> {
    ctx.require_supervisor()?;

    let record = attendance::patch(
        &pool,
        ctx.person_id,
        path.into_inner(),
        &payload,
        config.overtime_threshold_minutes,
    )
    .await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Paginated attendance listing, check-in ascending.
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(AttendanceFilter),
    responses(
        (status = 200, description = "Paginated attendance list", body = AttendanceListResponse),
        (status = 401, description = "Missing identity headers")
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    ctx: RequestContext,
    pool: web::Data<SqlitePool>,
    query: web::Query<AttendanceFilter>,
) -> Result<HttpResponse, ApiError> {
    // the caller's X-Division header is the default division filter
    let mut filter = query.into_inner();
    if filter.division.is_none() {
        filter.division = ctx.division;
    }

    let response = attendance::list(&pool, &filter).await?;
    Ok(HttpResponse::Ok().json(response))
}
