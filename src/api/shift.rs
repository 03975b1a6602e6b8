use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::model::shift::{ShiftSlot, SlotStatus};
use crate::store::shift;
use crate::store::shift::{CalendarFilter, CreateSlot, SlotRangeFilter};

/// Either a (re)assignment or a terminal status change, never both.
#[derive(Deserialize, ToSchema)]
pub struct SlotPatch {
    #[schema(example = 1000)]
    pub person_id: Option<i64>,
    /// Set true to clear the assignment (slot becomes OPEN).
    pub vacate: Option<bool>,
    /// Only COMPLETED or CANCELLED are accepted.
    pub status: Option<SlotStatus>,
}

#[utoipa::path(
    post,
    path = "/api/v1/shifts",
    request_body = CreateSlot,
    responses(
        (status = 200, description = "Slot created", body = ShiftSlot),
        (status = 400, description = "End time not after start time"),
        (status = 403, description = "Supervisor/Admin only"),
        (status = 409, description = "Overlapping assigned slot", body = Object, example = json!({
            "kind": "OVERLAP_CONFLICT",
            "detail": "person 1000 already holds an overlapping assigned slot on that date"
        }))
    ),
    tag = "Shifts"
)]
pub async fn create_slot(
    ctx: RequestContext,
    pool: web::Data<SqlitePool>,
    payload: web::Json<CreateSlot>,
) -> Result<HttpResponse, ApiError> {
    ctx.require_supervisor()?;

    let slot = shift::create_slot(&pool, &payload).await?;
    tracing::info!(slot_id = slot.id, site_id = slot.site_id, "slot created");
    Ok(HttpResponse::Ok().json(slot))
}

#[utoipa::path(
    patch,
    path = "/api/v1/shifts/{id}",
    request_body = SlotPatch,
    params(("id" = i64, Path, description = "Shift slot id")),
    responses(
        (status = 200, description = "Slot updated", body = ShiftSlot),
        (status = 400, description = "Invalid transition or empty patch"),
        (status = 403, description = "Supervisor/Admin only"),
        (status = 404, description = "Slot not found"),
        (status = 409, description = "Overlap conflict or terminal slot")
    ),
    tag = "Shifts"
)]
pub async fn patch_slot(
    ctx: RequestContext,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<SlotPatch>,
) -> Result<HttpResponse, ApiError> {
    ctx.require_supervisor()?;
    let slot_id = path.into_inner();

    let slot = if let Some(status) = payload.status {
        shift::set_status(&pool, slot_id, status).await?
    } else if payload.vacate == Some(true) {
        shift::assign_person(&pool, slot_id, None).await?
    } else if let Some(person_id) = payload.person_id {
        shift::assign_person(&pool, slot_id, Some(person_id)).await?
    } else {
        return Err(ApiError::InvalidFilter(
            "patch requires person_id, vacate, or status".into(),
        ));
    };

    Ok(HttpResponse::Ok().json(slot))
}

/// Calendar range listing, inclusive dates.
#[utoipa::path(
    get,
    path = "/api/v1/shifts",
    params(SlotRangeFilter),
    responses(
        (status = 200, description = "Slots in range", body = [ShiftSlot]),
        (status = 400, description = "Inverted date range")
    ),
    tag = "Shifts"
)]
pub async fn list_slots(
    _ctx: RequestContext,
    pool: web::Data<SqlitePool>,
    query: web::Query<SlotRangeFilter>,
) -> Result<HttpResponse, ApiError> {
    let slots =
        shift::list_range(&pool, query.site_id, query.division, query.start, query.end).await?;
    Ok(HttpResponse::Ok().json(slots))
}

/// One month of slots grouped by date, for the calendar view.
#[utoipa::path(
    get,
    path = "/api/v1/shifts/calendar",
    params(CalendarFilter),
    responses(
        (status = 200, description = "Slots grouped by date", body = Object),
        (status = 400, description = "Invalid year/month")
    ),
    tag = "Shifts"
)]
pub async fn calendar(
    _ctx: RequestContext,
    pool: web::Data<SqlitePool>,
    query: web::Query<CalendarFilter>,
) -> Result<HttpResponse, ApiError> {
    let grouped = shift::list_for_month(
        &pool,
        query.site_id,
        query.division,
        query.year,
        query.month,
    )
    .await?;
    Ok(HttpResponse::Ok().json(grouped))
}
