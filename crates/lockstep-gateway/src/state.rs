//! Gateway shared state.

use std::sync::Arc;

use tokio::sync::Mutex;

use lockstep_core::config::Config;
use lockstep_core::document::Target;
use lockstep_core::error::Result;
use lockstep_core::extract::{Extraction, extract};
use lockstep_core::score::ScoreSnapshot;
use lockstep_core::session::{FocusSession, Participant};
use lockstep_library::{Catalog, FileLessonStore, Lesson, LessonStore};

/// Shared gateway state accessible from all handlers.
///
/// The focus session sits behind one mutex: every `touch`, `reset` and
/// document switch runs under it, so "record only if absent" is atomic.
pub struct GatewayState {
    pub config: Arc<Config>,
    pub lessons: Arc<dyn LessonStore>,
    pub catalog: Mutex<Catalog>,
    pub session: Mutex<FocusSession>,
}

impl GatewayState {
    pub fn new(config: Arc<Config>, lessons: Arc<dyn LessonStore>, catalog: Catalog) -> Result<Self> {
        let session = FocusSession::with_tolerance(config.default_lesson(), config.tolerance_seconds())?;
        Ok(Self {
            config,
            lessons,
            catalog: Mutex::new(catalog),
            session: Mutex::new(session),
        })
    }

    /// Build state from config paths, registering the sample lesson.
    pub async fn from_config(config: Config) -> Result<Self> {
        let lessons = Arc::new(FileLessonStore::new(config.lessons_dir()));
        let catalog = Catalog::new(config.index_path());
        catalog
            .ensure_default(&lockstep_library::store::sample_lesson()?.title)
            .await?;
        Self::new(Arc::new(config), lessons, catalog)
    }

    pub async fn active_lesson_id(&self) -> String {
        self.session.lock().await.active_document_id.clone()
    }

    /// Load a lesson and extract its targets.
    pub async fn render_lesson(&self, lesson_id: &str) -> Result<(Lesson, Extraction)> {
        let lesson = self.lessons.require(lesson_id).await?;
        let extraction = extract(&lesson.content_html);
        Ok((lesson, extraction))
    }

    /// Targets are recomputed from the stored markup on every call.
    pub async fn targets(&self, lesson_id: &str) -> Result<Vec<Target>> {
        Ok(self.render_lesson(lesson_id).await?.1.targets)
    }

    /// Score the active document.
    ///
    /// Targets are loaded outside the session lock; if the active document
    /// changed meanwhile, the targets are reloaded for the new one.
    pub async fn score_active(&self) -> Result<(String, ScoreSnapshot)> {
        let mut lesson_id = self.active_lesson_id().await;
        loop {
            let targets = self.targets(&lesson_id).await?;
            let session = self.session.lock().await;
            if session.active_document_id == lesson_id {
                return Ok((lesson_id, session.score(&targets)));
            }
            lesson_id = session.active_document_id.clone();
        }
    }

    pub async fn touch(&self, participant: Participant, target_id: &str) -> f64 {
        let now = now_seconds();
        self.session.lock().await.touch(participant, target_id, now)
    }
}

/// Current wall-clock time as fractional UNIX seconds.
pub fn now_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
