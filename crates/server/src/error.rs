use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use siren_routing::RoutingError;
use siren_schedule::ScheduleError;
use siren_store::StoreError;

/// API-level error with a fixed status mapping:
/// validation → 400, unknown id → 404, duplicate unique key → 409,
/// store/unknown → 500, unimplemented surface → 501.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("unimplemented: {0}")]
    Unimplemented(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            StoreError::Invalid(_) => Self::BadRequest(err.to_string()),
            StoreError::Duplicate { .. } => Self::Conflict(err.to_string()),
            StoreError::Backend(_) => Self::Internal(err.to_string()),
            StoreError::Unimplemented(what) => Self::Unimplemented(what.to_owned()),
        }
    }
}

impl From<RoutingError> for ApiError {
    fn from(err: RoutingError) -> Self {
        match err {
            RoutingError::Store(e) => e.into(),
            RoutingError::Cel(e) => Self::BadRequest(e.to_string()),
        }
    }
}

impl From<ScheduleError> for ApiError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::Store(e) => e.into(),
            ScheduleError::NotOnCall { .. } | ScheduleError::InvalidTimezone(_) => {
                Self::BadRequest(err.to_string())
            }
            ScheduleError::NoActiveRotation(_) => Self::NotFound(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unimplemented(_) => StatusCode::NOT_IMPLEMENTED,
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_mapping() {
        assert!(matches!(
            ApiError::from(StoreError::not_found("site", "s1")),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(StoreError::duplicate("asn", 1)),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(StoreError::Invalid("page token".into())),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(StoreError::Unimplemented("escalation runtime")),
            ApiError::Unimplemented(_)
        ));
    }
}
