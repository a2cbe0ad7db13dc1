//! Plain-text lesson import.
//!
//! Only `.txt` and `.md` sources are read here. A readable file with no
//! usable text is reported as [`ImportOutcome::NoText`], separate from hard
//! failures, so callers can try another extraction strategy first.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use lockstep_core::error::{LockstepError, Result};
use lockstep_core::structure::build_structure;

use crate::catalog::Catalog;
use crate::store::{Lesson, LessonStore, validate_lesson_id};

/// Extensions accepted by [`read_text`].
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md"];

/// Shortest trimmed text accepted as lesson content.
const MIN_TEXT_CHARS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Text(String),
    /// The file was readable but held no usable text.
    NoText,
}

/// Decode an uploaded file. Unsupported extensions are a hard failure.
pub fn read_text(filename: &str, bytes: &[u8]) -> Result<ImportOutcome> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(LockstepError::Import(format!(
            "unsupported file type '{filename}', use .txt or .md"
        )));
    }

    let text = String::from_utf8_lossy(bytes).into_owned();
    if text.trim().chars().count() < MIN_TEXT_CHARS {
        return Ok(ImportOutcome::NoText);
    }
    Ok(ImportOutcome::Text(text))
}

/// A lesson created by an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedLesson {
    pub lesson_id: String,
    pub title: String,
}

/// Fresh id for an imported lesson: `u_` plus 8 hex characters.
pub fn new_lesson_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("u_{}", &hex[..8])
}

/// Import a text file: structure it, store it, and register it unpublished.
pub async fn import_lesson(
    store: &dyn LessonStore,
    catalog: &Catalog,
    filename: &str,
    bytes: &[u8],
    lesson_id: Option<String>,
    title: Option<String>,
) -> Result<ImportedLesson> {
    let text = match read_text(filename, bytes)? {
        ImportOutcome::Text(text) => text,
        ImportOutcome::NoText => {
            warn!(filename, "Import produced no usable text");
            return Err(LockstepError::Import(format!("no usable text found in '{filename}'")));
        }
    };

    let lesson_id = lesson_id.filter(|id| !id.is_empty()).unwrap_or_else(new_lesson_id);
    validate_lesson_id(&lesson_id)?;
    let title = title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("Imported Lesson ({filename})"));

    let lesson = Lesson {
        title: title.clone(),
        content_html: build_structure(&text).to_markup(),
    };
    store.save(&lesson_id, &lesson).await?;

    if catalog.get(&lesson_id).await?.is_none() {
        catalog.register(&lesson_id, &title).await?;
    }

    info!(lesson_id = %lesson_id, filename, "Imported lesson");
    Ok(ImportedLesson { lesson_id, title })
}
