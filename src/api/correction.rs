use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::config::Config;
use crate::context::RequestContext;
use crate::error::ApiError;
use crate::model::correction::CorrectionRequest;
use crate::store::correction;
use crate::store::correction::{CorrectionFilter, CorrectionListResponse, SubmitCorrection};

#[derive(Deserialize, ToSchema)]
pub struct RejectRequest {
    #[schema(example = "insufficient evidence")]
    pub reason: String,
}

/* =========================
Submit correction
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/corrections",
    request_body = SubmitCorrection,
    responses(
        (status = 200, description = "Correction submitted", body = CorrectionRequest),
        (status = 400, description = "No requested field or blank reason", body = Object, example = json!({
            "kind": "EMPTY_REASON",
            "detail": "a correction requires a non-empty reason"
        })),
        (status = 403, description = "Officers may only target themselves")
    ),
    tag = "Corrections"
)]
pub async fn submit_correction(
    ctx: RequestContext,
    pool: web::Data<SqlitePool>,
    payload: web::Json<SubmitCorrection>,
) -> Result<HttpResponse, ApiError> {
    let correction = correction::submit(&pool, &ctx, &payload).await?;
    tracing::info!(correction_id = correction.id, person_id = correction.person_id, "correction submitted");
    Ok(HttpResponse::Ok().json(correction))
}

/* =========================
Approve correction (Supervisor/Admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/corrections/{id}/approve",
    params(("id" = i64, Path, description = "Correction id")),
    responses(
        (status = 200, description = "Correction approved and applied", body = CorrectionRequest),
        (status = 403, description = "Supervisor/Admin only"),
        (status = 404, description = "Correction not found"),
        (status = 409, description = "Already resolved", body = Object, example = json!({
            "kind": "NOT_PENDING",
            "detail": "correction 1 is already resolved"
        }))
    ),
    tag = "Corrections"
)]
pub async fn approve_correction(
    ctx: RequestContext,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    ctx.require_supervisor()?;

    let correction = correction::approve(
        &pool,
        &ctx,
        path.into_inner(),
        config.overtime_threshold_minutes,
    )
    .await?;
    Ok(HttpResponse::Ok().json(correction))
}

/* =========================
Reject correction (Supervisor/Admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/corrections/{id}/reject",
    request_body = RejectRequest,
    params(("id" = i64, Path, description = "Correction id")),
    responses(
        (status = 200, description = "Correction rejected", body = CorrectionRequest),
        (status = 400, description = "Blank rejection reason"),
        (status = 403, description = "Supervisor/Admin only"),
        (status = 404, description = "Correction not found"),
        (status = 409, description = "Already resolved")
    ),
    tag = "Corrections"
)]
pub async fn reject_correction(
    ctx: RequestContext,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<RejectRequest>,
) -> Result<HttpResponse, ApiError> {
    ctx.require_supervisor()?;

    let correction = correction::reject(&pool, &ctx, path.into_inner(), &payload.reason).await?;
    Ok(HttpResponse::Ok().json(correction))
}

#[utoipa::path(
    get,
    path = "/api/v1/corrections/{id}",
    params(("id" = i64, Path, description = "Correction id")),
    responses(
        (status = 200, description = "Correction found", body = CorrectionRequest),
        (status = 403, description = "Not the owner and not a supervisor"),
        (status = 404, description = "Correction not found")
    ),
    tag = "Corrections"
)]
pub async fn get_correction(
    ctx: RequestContext,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let correction = correction::fetch(&pool, path.into_inner()).await?;
    if ctx.is_officer() && correction.person_id != ctx.person_id {
        return Err(ApiError::Forbidden(
            "officers may only view their own corrections".into(),
        ));
    }
    Ok(HttpResponse::Ok().json(correction))
}

#[utoipa::path(
    get,
    path = "/api/v1/corrections",
    params(CorrectionFilter),
    responses(
        (status = 200, description = "Paginated correction list", body = CorrectionListResponse),
        (status = 403, description = "Supervisor/Admin only")
    ),
    tag = "Corrections"
)]
pub async fn list_corrections(
    ctx: RequestContext,
    pool: web::Data<SqlitePool>,
    query: web::Query<CorrectionFilter>,
) -> Result<HttpResponse, ApiError> {
    ctx.require_supervisor()?;

    let response = correction::list(&pool, &query).await?;
    Ok(HttpResponse::Ok().json(response))
}
