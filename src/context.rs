use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

use crate::error::ApiError;
use crate::model::{division::Division, role::Role};

/// Request-scoped caller identity, taken from gateway-verified headers.
/// Passed explicitly into every core operation; never ambient state.
pub struct RequestContext {
    pub person_id: i64,
    pub role: Role,
    /// Division the caller is currently operating in, if the client sent one.
    pub division: Option<Division>,
}

impl FromRequest for RequestContext {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
        };

        let person_id = match header("X-Person-Id").and_then(|v| v.parse::<i64>().ok()) {
            Some(v) => v,
            None => return ready(Err(ApiError::Unauthorized)),
        };

        let role = match header("X-Role").and_then(|v| v.parse::<Role>().ok()) {
            Some(r) => r,
            None => return ready(Err(ApiError::Unauthorized)),
        };

        let division = header("X-Division").and_then(|v| v.parse::<Division>().ok());

        ready(Ok(RequestContext {
            person_id,
            role,
            division,
        }))
    }
}

impl RequestContext {
    pub fn require_supervisor(&self) -> Result<(), ApiError> {
        if matches!(self.role, Role::Supervisor | Role::Admin) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("supervisor or admin only".into()))
        }
    }

    pub fn is_officer(&self) -> bool {
        self.role == Role::Officer
    }
}
