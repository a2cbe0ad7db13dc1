use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockstepError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Token range [{start}, {end}) is outside a stream of {len} tokens")]
    InvalidTokenRange { start: usize, end: usize, len: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Lesson not found: {0}")]
    LessonNotFound(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LockstepError {
    /// Stable machine-readable code used in wire error shapes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::InvalidTokenRange { .. } => "invalid_token_range",
            Self::InvalidInput(_) => "invalid_params",
            Self::LessonNotFound(_) => "lesson_not_found",
            Self::Import(_) => "import_failed",
            Self::Io(_) => "io_error",
            Self::Json(_) => "invalid_json",
            Self::Other(_) => "internal_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, LockstepError>;
