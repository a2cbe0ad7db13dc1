//! File-based lesson store — one JSON document per lesson.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use lockstep_core::config::DEFAULT_LESSON_ID;
use lockstep_core::error::{LockstepError, Result};

const SAMPLE_LESSON: &str = include_str!("../assets/sample_lesson.json");

/// A stored lesson: a title plus annotated markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub title: String,
    pub content_html: String,
}

/// Where a listed lesson comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonOrigin {
    Builtin,
    Upload,
}

/// Listing entry for a stored lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonSource {
    pub id: String,
    pub title: String,
    pub source: LessonOrigin,
}

/// Persistence for lessons, keyed by lesson id.
#[async_trait]
pub trait LessonStore: Send + Sync {
    async fn load(&self, id: &str) -> Result<Option<Lesson>>;
    async fn save(&self, id: &str, lesson: &Lesson) -> Result<()>;
    async fn list(&self) -> Result<Vec<LessonSource>>;

    /// Like [`load`](Self::load) but a missing lesson is an error.
    async fn require(&self, id: &str) -> Result<Lesson> {
        self.load(id)
            .await?
            .ok_or_else(|| LockstepError::LessonNotFound(id.to_string()))
    }
}

/// The bundled sample lesson.
pub fn sample_lesson() -> Result<Lesson> {
    Ok(serde_json::from_str(SAMPLE_LESSON)?)
}

/// Lesson ids become file names, so only `[A-Za-z0-9_-]` is allowed.
pub fn validate_lesson_id(id: &str) -> Result<()> {
    let ok = !id.is_empty()
        && id.len() <= 128
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(LockstepError::InvalidInput(format!("invalid lesson id '{id}'")))
    }
}

/// Layout: `<dir>/<lesson_id>.json`. The sample lesson is served from the
/// binary unless an uploaded file with the same id overrides it.
pub struct FileLessonStore {
    dir: PathBuf,
}

impl FileLessonStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn lesson_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn read_lesson(&self, path: &Path) -> Result<Lesson> {
        let data = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&data)?)
    }
}

#[async_trait]
impl LessonStore for FileLessonStore {
    async fn load(&self, id: &str) -> Result<Option<Lesson>> {
        validate_lesson_id(id)?;
        let path = self.lesson_path(id);
        if path.exists() {
            let lesson = self.read_lesson(&path).await?;
            debug!(id, "Loaded lesson from disk");
            return Ok(Some(lesson));
        }
        if id == DEFAULT_LESSON_ID {
            return sample_lesson().map(Some);
        }
        Ok(None)
    }

    async fn save(&self, id: &str, lesson: &Lesson) -> Result<()> {
        validate_lesson_id(id)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.lesson_path(id);
        let data = serde_json::to_string_pretty(lesson)?;
        // Atomic write: write to temp then rename
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data.as_bytes()).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(id, "Saved lesson");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<LessonSource>> {
        let mut uploads = Vec::new();
        if self.dir.exists() {
            let mut entries = tokio::fs::read_dir(&self.dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                    continue;
                };
                let title = match self.read_lesson(&path).await {
                    Ok(lesson) => lesson.title,
                    Err(e) => {
                        warn!(id = %id, error = %e, "Unreadable lesson file, listing by id");
                        id.clone()
                    }
                };
                uploads.push(LessonSource {
                    id,
                    title,
                    source: LessonOrigin::Upload,
                });
            }
        }
        uploads.sort_by(|a, b| a.id.cmp(&b.id));

        let mut items = Vec::with_capacity(uploads.len() + 1);
        if !uploads.iter().any(|u| u.id == DEFAULT_LESSON_ID) {
            items.push(LessonSource {
                id: DEFAULT_LESSON_ID.to_string(),
                title: sample_lesson()?.title,
                source: LessonOrigin::Builtin,
            });
        }
        items.extend(uploads);
        Ok(items)
    }
}
