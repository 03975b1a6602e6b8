use utoipa::OpenApi;

use crate::api::attendance::{CheckInRequest, CheckOutRequest};
use crate::api::correction::RejectRequest;
use crate::api::shift::SlotPatch;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, Evidence};
use crate::model::correction::{CorrectionRequest, CorrectionStatus};
use crate::model::division::Division;
use crate::model::overview::{
    DivisionAttendanceSnapshot, DivisionOverview, DivisionTaskCompletion, KpiKind, KpiRate,
    ManpowerRow, Overview,
};
use crate::model::shift::{ShiftSlot, SlotStatus};
use crate::store::attendance::{AttendanceFilter, AttendanceListResponse, AttendancePatch};
use crate::store::correction::{CorrectionFilter, CorrectionListResponse, SubmitCorrection};
use crate::store::shift::{CalendarFilter, CreateSlot, SlotRangeFilter};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fieldops Attendance API",
        version = "1.0.0",
        description = r#"
## Attendance lifecycle reconciliation

Turns raw check-in/check-out events into attendance records, routes
supervisor corrections through an approve/reject workflow, schedules
shift slots, and reconciles plan against actuals into per-division
overview metrics, manpower counts, and KPI rates.

Identity is taken from gateway-verified headers on every request:
`X-Person-Id`, `X-Role` (OFFICER | SUPERVISOR | ADMIN) and optionally
`X-Division`.

Errors are structured: every failure body carries a machine-readable
`kind` and a human-readable `detail`. Branch on the kind, never on the
detail text.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::patch_attendance,
        crate::api::attendance::list_attendance,

        crate::api::correction::submit_correction,
        crate::api::correction::approve_correction,
        crate::api::correction::reject_correction,
        crate::api::correction::get_correction,
        crate::api::correction::list_corrections,

        crate::api::shift::create_slot,
        crate::api::shift::patch_slot,
        crate::api::shift::list_slots,
        crate::api::shift::calendar,

        crate::api::reconcile::overview,
        crate::api::reconcile::manpower,
        crate::api::reconcile::kpi
    ),
    components(
        schemas(
            Division,
            AttendanceStatus,
            Evidence,
            AttendanceRecord,
            AttendancePatch,
            AttendanceFilter,
            AttendanceListResponse,
            CheckInRequest,
            CheckOutRequest,
            CorrectionStatus,
            CorrectionRequest,
            SubmitCorrection,
            RejectRequest,
            CorrectionFilter,
            CorrectionListResponse,
            SlotStatus,
            ShiftSlot,
            CreateSlot,
            SlotPatch,
            SlotRangeFilter,
            CalendarFilter,
            DivisionAttendanceSnapshot,
            DivisionTaskCompletion,
            DivisionOverview,
            Overview,
            ManpowerRow,
            KpiKind,
            KpiRate
        )
    ),
    tags(
        (name = "Attendance", description = "Check-in/check-out lifecycle APIs"),
        (name = "Corrections", description = "Approval-gated attendance correction APIs"),
        (name = "Shifts", description = "Shift slot scheduling APIs"),
        (name = "Reconciliation", description = "Read-only overview, manpower and KPI APIs"),
    )
)]
pub struct ApiDoc;
