//! Wire shapes shared by the HTTP gateway and its clients.
//!
//! Every response body carries an `ok` flag; failures carry an [`ErrorShape`].

use serde::{Deserialize, Serialize};

use crate::annotate::{BlockSpec, Token};
use crate::document::Target;
use crate::error::LockstepError;
use crate::score::ScoreSnapshot;

/// Error shape returned in failed responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorShape {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&LockstepError> for ErrorShape {
    fn from(err: &LockstepError) -> Self {
        let details = match err {
            LockstepError::InvalidTokenRange { start, end, len } => Some(serde_json::json!({
                "token_range": [start, end],
                "tokens": len,
            })),
            _ => None,
        };
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            details,
        }
    }
}

/// `{ "ok": false, "error": {...} }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: ErrorShape,
}

impl ErrorBody {
    pub fn new(error: ErrorShape) -> Self {
        Self { ok: false, error }
    }
}

/// What a presenter or follower needs to render the active document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonView {
    pub lesson_id: String,
    pub title: String,
    pub content_html: String,
    pub targets: Vec<Target>,
    pub tolerance_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResponse {
    pub lesson_id: String,
    pub targets: Vec<Target>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TouchRequest {
    pub target_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TouchResponse {
    pub ok: bool,
    /// First recorded timestamp (UNIX seconds) for this participant and target.
    pub ts: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub ok: bool,
    pub lesson_id: String,
    #[serde(flatten)]
    pub score: ScoreSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToleranceRequest {
    pub tolerance_seconds: f64,
}

/// Token-editor save: tokens plus the block layout they belong to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateLessonRequest {
    #[serde(default)]
    pub lesson_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub structure: Vec<BlockSpec>,
}

/// Plain-text import; `content` is the file's text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportLessonRequest {
    pub filename: String,
    pub content: String,
    #[serde(default)]
    pub lesson_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonSaved {
    pub ok: bool,
    pub lesson_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_shape_from_token_range() {
        let err = LockstepError::InvalidTokenRange { start: 4, end: 9, len: 5 };
        let shape = ErrorShape::from(&err);
        assert_eq!(shape.code, "invalid_token_range");
        assert_eq!(shape.details.unwrap()["tokens"], 5);
    }

    #[test]
    fn test_update_request_defaults() {
        let req: UpdateLessonRequest = serde_json::from_str("{}").unwrap();
        assert!(req.lesson_id.is_none());
        assert!(req.tokens.is_empty());
        assert!(req.structure.is_empty());
    }

    #[test]
    fn test_error_body_serialization() {
        let body = ErrorBody::new(ErrorShape::from(&LockstepError::LessonNotFound("x".into())));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"]["code"], "lesson_not_found");
        assert!(json["error"].get("details").is_none());
    }
}
