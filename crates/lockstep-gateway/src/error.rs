//! Mapping core errors onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use lockstep_core::error::LockstepError;
use lockstep_core::protocol::{ErrorBody, ErrorShape};

/// Handler error: a core error rendered as `{ "ok": false, "error": {...} }`.
#[derive(Debug)]
pub struct ApiError(pub LockstepError);

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self(LockstepError::InvalidInput(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            LockstepError::LessonNotFound(_) => StatusCode::NOT_FOUND,
            LockstepError::InvalidInput(_)
            | LockstepError::InvalidTokenRange { .. }
            | LockstepError::Import(_)
            | LockstepError::Config(_) => StatusCode::BAD_REQUEST,
            LockstepError::Io(_) | LockstepError::Json(_) | LockstepError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<LockstepError> for ApiError {
    fn from(err: LockstepError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        } else {
            warn!(code = self.0.code(), error = %self.0, "Request rejected");
        }
        #[cfg(feature = "metrics")]
        crate::metrics::record_error(self.0.code());

        (status, Json(ErrorBody::new(ErrorShape::from(&self.0)))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError(LockstepError::LessonNotFound("x".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError(LockstepError::InvalidTokenRange { start: 0, end: 5, len: 2 }).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::invalid("nope").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError(LockstepError::Io(std::io::Error::other("disk"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
