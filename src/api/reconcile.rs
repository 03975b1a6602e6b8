use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::IntoParams;

use crate::config::Config;
use crate::context::RequestContext;
use crate::error::ApiError;
use crate::model::division::Division;
use crate::model::overview::{KpiKind, KpiRate, ManpowerRow, Overview};
use crate::store::reconcile;

#[derive(Deserialize, IntoParams)]
pub struct OverviewQuery {
    #[param(value_type = String)]
    pub date: NaiveDate,
    #[param(example = 42)]
    pub site_id: Option<i64>,
}

#[derive(Deserialize, IntoParams)]
pub struct ManpowerQuery {
    #[param(value_type = String)]
    pub date: NaiveDate,
    #[param(example = 42)]
    pub site_id: Option<i64>,
    pub division: Option<Division>,
}

#[derive(Deserialize, IntoParams)]
pub struct KpiQuery {
    #[param(value_type = String)]
    pub from: NaiveDate,
    #[param(value_type = String)]
    pub to: NaiveDate,
    #[param(example = 42)]
    pub site_id: Option<i64>,
}

/// Per-division attendance/slot reconciliation for one day.
#[utoipa::path(
    get,
    path = "/api/v1/overview",
    params(OverviewQuery),
    responses(
        (status = 200, description = "Division overview", body = Overview),
        (status = 401, description = "Missing identity headers")
    ),
    tag = "Reconciliation"
)]
pub async fn overview(
    _ctx: RequestContext,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    query: web::Query<OverviewQuery>,
) -> Result<HttpResponse, ApiError> {
    let overview = reconcile::compute_overview(
        &pool,
        query.date,
        query.site_id,
        config.grace_window_minutes,
        Utc::now().naive_utc(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(overview))
}

/// Scheduled vs. active headcount per area.
#[utoipa::path(
    get,
    path = "/api/v1/manpower",
    params(ManpowerQuery),
    responses(
        (status = 200, description = "Manpower rows", body = [ManpowerRow])
    ),
    tag = "Reconciliation"
)]
pub async fn manpower(
    _ctx: RequestContext,
    pool: web::Data<SqlitePool>,
    query: web::Query<ManpowerQuery>,
) -> Result<HttpResponse, ApiError> {
    let rows =
        reconcile::compute_manpower(&pool, query.date, query.site_id, query.division).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// Completion percentage for one KPI kind over a date range.
#[utoipa::path(
    get,
    path = "/api/v1/kpi/{kind}",
    params(
        ("kind" = String, Path, description = "patrol | report | training | cctv"),
        KpiQuery
    ),
    responses(
        (status = 200, description = "KPI rate", body = KpiRate),
        (status = 400, description = "Unknown kind or inverted range")
    ),
    tag = "Reconciliation"
)]
pub async fn kpi(
    _ctx: RequestContext,
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
    query: web::Query<KpiQuery>,
) -> Result<HttpResponse, ApiError> {
    let kind = path
        .parse::<KpiKind>()
        .map_err(|_| ApiError::InvalidFilter(format!("unknown KPI kind '{path}'")))?;

    let rate = reconcile::compute_kpi(&pool, kind, query.from, query.to, query.site_id).await?;
    Ok(HttpResponse::Ok().json(rate))
}
