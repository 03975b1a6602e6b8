use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use thiserror::Error;

/// Every failure carries a machine-readable `kind` plus a human-readable
/// detail. Clients branch on the kind, never on the detail text.
#[derive(Debug, Error)]
pub enum ApiError {
    // validation
    #[error("a correction must request at least one field")]
    EmptyRequest,
    #[error("a correction requires a non-empty reason")]
    EmptyReason,
    #[error("rejecting a correction requires a non-empty reason")]
    EmptyRejectionReason,
    #[error("check-out must be strictly after check-in")]
    InvalidOrdering,
    #[error("{0}")]
    InvalidTransition(String),
    #[error("{0}")]
    InvalidFilter(String),
    #[error("correction targets a missing record but requests no check-in time")]
    MissingCheckIn,

    // conflicts: the caller must re-fetch current state before retrying
    #[error("person {person_id} already has an open attendance record at site {site_id}")]
    DuplicateOpenRecord { person_id: i64, site_id: i64 },
    #[error("person {0} already holds an overlapping assigned slot on that date")]
    OverlapConflict(i64),
    #[error("correction {0} is already resolved")]
    NotPending(i64),
    #[error("attendance record {0} is already checked out")]
    AlreadyClosed(i64),

    // not found
    #[error("no attendance record with id {0}")]
    RecordNotFound(i64),
    #[error("no correction with id {0}")]
    CorrectionNotFound(i64),
    #[error("no shift slot with id {0}")]
    SlotNotFound(i64),
    #[error("shift slot {0} is in a terminal status")]
    SlotTerminal(i64),

    // access
    #[error("{0}")]
    Forbidden(String),
    #[error("missing or malformed identity headers")]
    Unauthorized,

    #[error("database failure")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::EmptyRequest => "EMPTY_REQUEST",
            ApiError::EmptyReason => "EMPTY_REASON",
            ApiError::EmptyRejectionReason => "EMPTY_REJECTION_REASON",
            ApiError::InvalidOrdering => "INVALID_ORDERING",
            ApiError::InvalidTransition(_) => "INVALID_TRANSITION",
            ApiError::InvalidFilter(_) => "INVALID_FILTER",
            ApiError::MissingCheckIn => "MISSING_CHECK_IN",
            ApiError::DuplicateOpenRecord { .. } => "DUPLICATE_OPEN_RECORD",
            ApiError::OverlapConflict(_) => "OVERLAP_CONFLICT",
            ApiError::NotPending(_) => "NOT_PENDING",
            ApiError::AlreadyClosed(_) => "ALREADY_CLOSED",
            ApiError::RecordNotFound(_) => "RECORD_NOT_FOUND",
            ApiError::CorrectionNotFound(_) => "CORRECTION_NOT_FOUND",
            ApiError::SlotNotFound(_) => "SLOT_NOT_FOUND",
            ApiError::SlotTerminal(_) => "SLOT_TERMINAL",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::Database(_) => "DATABASE",
        }
    }
}

impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::EmptyRequest
            | ApiError::EmptyReason
            | ApiError::EmptyRejectionReason
            | ApiError::InvalidOrdering
            | ApiError::InvalidTransition(_)
            | ApiError::InvalidFilter(_)
            | ApiError::MissingCheckIn => StatusCode::BAD_REQUEST,
            ApiError::DuplicateOpenRecord { .. }
            | ApiError::OverlapConflict(_)
            | ApiError::NotPending(_)
            | ApiError::AlreadyClosed(_) => StatusCode::CONFLICT,
            ApiError::RecordNotFound(_)
            | ApiError::CorrectionNotFound(_)
            | ApiError::SlotNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::SlotTerminal(_) => StatusCode::CONFLICT,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Database(e) = self {
            tracing::error!(error = %e, "database failure");
        }
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "kind": self.kind(),
            "detail": self.to_string(),
        }))
    }
}
