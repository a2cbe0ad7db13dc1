//! Lesson catalog — publish, class visibility, and ordering metadata.
//!
//! The metadata lives in a single index file next to the lessons and is kept
//! apart from lesson content: the core never reads it.

use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use lockstep_core::config::DEFAULT_LESSON_ID;
use lockstep_core::error::Result;

use crate::store::{LessonOrigin, LessonSource};

/// Sort position given to lessons that have never been ordered.
pub const UNORDERED: i64 = 9999;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default = "default_order")]
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

fn default_order() -> i64 {
    UNORDERED
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogIndex {
    #[serde(default)]
    lessons: Vec<CatalogEntry>,
}

/// Fields a publish request may change; absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

/// Who is asking for the lesson list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    #[serde(alias = "teacher")]
    Presenter,
    #[default]
    #[serde(alias = "student")]
    Follower,
}

/// A stored lesson joined with its catalog metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogListing {
    pub id: String,
    pub title: String,
    pub source: LessonOrigin,
    pub published: bool,
    pub classes: Vec<String>,
    pub order: i64,
    pub updated_at: Option<String>,
}

impl CatalogListing {
    /// Presenters see everything (or only published lessons unless
    /// `include_unpublished`); followers see published lessons whose class
    /// list is empty or names their class.
    pub fn visible_to(&self, audience: Audience, class: Option<&str>, include_unpublished: bool) -> bool {
        match audience {
            Audience::Presenter => include_unpublished || self.published,
            Audience::Follower => {
                self.published
                    && (self.classes.is_empty()
                        || class.is_some_and(|c| self.classes.iter().any(|k| k == c)))
            }
        }
    }
}

fn now_stamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Persistent catalog index.
pub struct Catalog {
    path: PathBuf,
}

impl Catalog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn load_index(&self) -> Result<CatalogIndex> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(CatalogIndex::default());
        }
        let data = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&data)?)
    }

    async fn save_index(&self, index: &CatalogIndex) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(index)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json.as_bytes()).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    pub async fn entries(&self) -> Result<Vec<CatalogEntry>> {
        Ok(self.load_index().await?.lessons)
    }

    pub async fn get(&self, id: &str) -> Result<Option<CatalogEntry>> {
        Ok(self.load_index().await?.lessons.into_iter().find(|e| e.id == id))
    }

    /// Make sure the sample lesson is listed as published, first in order.
    pub async fn ensure_default(&self, title: &str) -> Result<()> {
        let mut index = self.load_index().await?;
        if index.lessons.iter().any(|e| e.id == DEFAULT_LESSON_ID) {
            return Ok(());
        }
        index.lessons.push(CatalogEntry {
            id: DEFAULT_LESSON_ID.to_string(),
            title: title.to_string(),
            published: true,
            classes: Vec::new(),
            order: 1,
            updated_at: Some(now_stamp()),
        });
        self.save_index(&index).await?;
        debug!("Registered sample lesson in catalog");
        Ok(())
    }

    /// Add an unpublished entry, or retitle an existing one.
    pub async fn register(&self, id: &str, title: &str) -> Result<CatalogEntry> {
        let mut index = self.load_index().await?;
        let entry = match index.lessons.iter_mut().find(|e| e.id == id) {
            Some(existing) => {
                if !title.is_empty() {
                    existing.title = title.to_string();
                }
                existing.updated_at = Some(now_stamp());
                existing.clone()
            }
            None => {
                let entry = CatalogEntry {
                    id: id.to_string(),
                    title: if title.is_empty() { id.to_string() } else { title.to_string() },
                    published: false,
                    classes: Vec::new(),
                    order: UNORDERED,
                    updated_at: Some(now_stamp()),
                };
                index.lessons.push(entry.clone());
                entry
            }
        };
        self.save_index(&index).await?;
        debug!(id, "Registered lesson");
        Ok(entry)
    }

    /// Apply a publish patch, creating the entry (titled `fallback_title`) if missing.
    pub async fn publish(&self, id: &str, fallback_title: &str, patch: &PublishPatch) -> Result<CatalogEntry> {
        let mut index = self.load_index().await?;
        let pos = match index.lessons.iter().position(|e| e.id == id) {
            Some(pos) => pos,
            None => {
                index.lessons.push(CatalogEntry {
                    id: id.to_string(),
                    title: fallback_title.to_string(),
                    published: false,
                    classes: Vec::new(),
                    order: UNORDERED,
                    updated_at: None,
                });
                index.lessons.len() - 1
            }
        };

        let entry = &mut index.lessons[pos];
        if let Some(published) = patch.published {
            entry.published = published;
        }
        if let Some(classes) = &patch.classes {
            entry.classes = classes.clone();
        }
        if let Some(order) = patch.order {
            entry.order = order;
        }
        entry.updated_at = Some(now_stamp());
        let entry = entry.clone();

        self.save_index(&index).await?;
        debug!(id, published = entry.published, order = entry.order, "Updated publish settings");
        Ok(entry)
    }

    /// Join stored lessons with catalog metadata, sorted by `(order, title)`.
    pub async fn merge(&self, items: Vec<LessonSource>) -> Result<Vec<CatalogListing>> {
        let index = self.load_index().await?;
        let mut out: Vec<CatalogListing> = items
            .into_iter()
            .map(|item| {
                let meta = index.lessons.iter().find(|e| e.id == item.id);
                let builtin = item.source == LessonOrigin::Builtin;
                CatalogListing {
                    published: meta.map(|m| m.published).unwrap_or(builtin),
                    classes: meta.map(|m| m.classes.clone()).unwrap_or_default(),
                    order: meta.map(|m| m.order).unwrap_or(if builtin { 1 } else { UNORDERED }),
                    updated_at: meta.and_then(|m| m.updated_at.clone()),
                    id: item.id,
                    title: item.title,
                    source: item.source,
                }
            })
            .collect();
        out.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.title.cmp(&b.title)));
        Ok(out)
    }
}
