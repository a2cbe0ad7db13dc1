//! Lesson persistence and import for Lockstep.
//!
//! These are the collaborators around the core: where lessons are stored,
//! which of them are published to which classes, and how plain text files
//! become lessons.

pub mod catalog;
pub mod import;
pub mod store;

pub use catalog::{Audience, Catalog, CatalogEntry, CatalogListing, PublishPatch};
pub use import::{ImportOutcome, ImportedLesson, import_lesson};
pub use store::{FileLessonStore, Lesson, LessonOrigin, LessonSource, LessonStore};
