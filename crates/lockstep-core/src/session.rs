//! Focus session — first-touch timestamps per participant per target.
//!
//! A session only accumulates: a touch, once recorded, is never overwritten
//! until [`FocusSession::reset`]. The session itself holds no lock; the
//! hosting service owns it behind a single mutex so `touch` is an atomic
//! check-then-set.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::Target;
use crate::error::{LockstepError, Result};
use crate::score::{ScoreSnapshot, score};

/// Tolerance window used when none is configured.
pub const DEFAULT_TOLERANCE_SECONDS: f64 = 30.0;

/// Which side of the session reported a touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Participant {
    #[serde(alias = "teacher")]
    Presenter,
    #[serde(alias = "student")]
    Follower,
}

impl Participant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Presenter => "presenter",
            Self::Follower => "follower",
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Participant {
    type Err = LockstepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "presenter" | "teacher" => Ok(Self::Presenter),
            "follower" | "student" => Ok(Self::Follower),
            other => Err(LockstepError::InvalidInput(format!("unknown participant '{other}'"))),
        }
    }
}

/// The one mutable session of a deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusSession {
    pub active_document_id: String,
    presenter_touches: HashMap<String, f64>,
    follower_touches: HashMap<String, f64>,
    tolerance_seconds: f64,
}

/// Counts-only view of a session for status output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub active_document_id: String,
    pub presenter_touches: usize,
    pub follower_touches: usize,
    pub tolerance_seconds: f64,
}

impl FocusSession {
    pub fn new(active_document_id: impl Into<String>) -> Self {
        Self {
            active_document_id: active_document_id.into(),
            presenter_touches: HashMap::new(),
            follower_touches: HashMap::new(),
            tolerance_seconds: DEFAULT_TOLERANCE_SECONDS,
        }
    }

    /// Start with a configured tolerance; rejects negative or non-finite values.
    pub fn with_tolerance(active_document_id: impl Into<String>, tolerance_seconds: f64) -> Result<Self> {
        let mut session = Self::new(active_document_id);
        session.set_tolerance(tolerance_seconds)?;
        Ok(session)
    }

    /// Record `now` for `(participant, target_id)` unless already present.
    ///
    /// Returns the recorded timestamp, which is the earlier one on a
    /// duplicate touch. Unknown target ids are accepted and simply never
    /// contribute to a score.
    pub fn touch(&mut self, participant: Participant, target_id: &str, now: f64) -> f64 {
        let touches = self.touches_mut(participant);
        if let Some(existing) = touches.get(target_id) {
            debug!(%participant, target_id, "Duplicate touch ignored");
            return *existing;
        }
        touches.insert(target_id.to_string(), now);
        debug!(%participant, target_id, ts = now, "Recorded first touch");
        now
    }

    pub fn touched_at(&self, participant: Participant, target_id: &str) -> Option<f64> {
        self.touches(participant).get(target_id).copied()
    }

    pub fn touches(&self, participant: Participant) -> &HashMap<String, f64> {
        match participant {
            Participant::Presenter => &self.presenter_touches,
            Participant::Follower => &self.follower_touches,
        }
    }

    fn touches_mut(&mut self, participant: Participant) -> &mut HashMap<String, f64> {
        match participant {
            Participant::Presenter => &mut self.presenter_touches,
            Participant::Follower => &mut self.follower_touches,
        }
    }

    /// Clear both touch maps; document and tolerance are kept.
    pub fn reset(&mut self) {
        self.presenter_touches.clear();
        self.follower_touches.clear();
        info!(document = %self.active_document_id, "Session touches cleared");
    }

    /// Switch documents. Touches are kept; call [`reset`](Self::reset) for a clean run.
    pub fn set_active_document(&mut self, id: impl Into<String>) {
        let id = id.into();
        if id != self.active_document_id {
            info!(from = %self.active_document_id, to = %id, "Active document switched");
            self.active_document_id = id;
        }
    }

    pub fn tolerance_seconds(&self) -> f64 {
        self.tolerance_seconds
    }

    pub fn set_tolerance(&mut self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(LockstepError::Config(format!(
                "tolerance must be a non-negative number of seconds, got {seconds}"
            )));
        }
        self.tolerance_seconds = seconds;
        Ok(())
    }

    /// Score this session against the current target list.
    pub fn score(&self, targets: &[Target]) -> ScoreSnapshot {
        score(
            targets,
            &self.presenter_touches,
            &self.follower_touches,
            self.tolerance_seconds,
        )
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            active_document_id: self.active_document_id.clone(),
            presenter_touches: self.presenter_touches.len(),
            follower_touches: self.follower_touches.len(),
            tolerance_seconds: self.tolerance_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_touch_wins() {
        let mut session = FocusSession::new("lesson_bio");
        assert_eq!(session.touch(Participant::Presenter, "t1", 100.0), 100.0);
        assert_eq!(session.touch(Participant::Presenter, "t1", 999.0), 100.0);
        assert_eq!(session.touched_at(Participant::Presenter, "t1"), Some(100.0));
    }

    #[test]
    fn test_participants_are_independent() {
        let mut session = FocusSession::new("doc");
        session.touch(Participant::Presenter, "t1", 1.0);
        assert_eq!(session.touched_at(Participant::Follower, "t1"), None);
        assert_eq!(session.touch(Participant::Follower, "t1", 7.0), 7.0);
        assert_eq!(session.touched_at(Participant::Presenter, "t1"), Some(1.0));
    }

    #[test]
    fn test_reset_keeps_document_and_tolerance() {
        let mut session = FocusSession::with_tolerance("doc", 12.5).unwrap();
        session.touch(Participant::Presenter, "t1", 1.0);
        session.touch(Participant::Follower, "t1", 2.0);
        session.reset();

        assert!(session.touches(Participant::Presenter).is_empty());
        assert!(session.touches(Participant::Follower).is_empty());
        assert_eq!(session.active_document_id, "doc");
        assert_eq!(session.tolerance_seconds(), 12.5);
        // A fresh touch after reset is recorded again
        assert_eq!(session.touch(Participant::Presenter, "t1", 50.0), 50.0);
    }

    #[test]
    fn test_switching_document_does_not_reset() {
        let mut session = FocusSession::new("a");
        session.touch(Participant::Follower, "t1", 3.0);
        session.set_active_document("b");
        assert_eq!(session.active_document_id, "b");
        assert_eq!(session.touched_at(Participant::Follower, "t1"), Some(3.0));
    }

    #[test]
    fn test_tolerance_validation() {
        let mut session = FocusSession::new("doc");
        assert_eq!(session.tolerance_seconds(), DEFAULT_TOLERANCE_SECONDS);
        assert!(session.set_tolerance(-1.0).is_err());
        assert!(session.set_tolerance(f64::NAN).is_err());
        assert!(FocusSession::with_tolerance("doc", f64::INFINITY).is_err());
        session.set_tolerance(0.0).unwrap();
        assert_eq!(session.tolerance_seconds(), 0.0);
    }

    #[test]
    fn test_session_score_uses_touches() {
        let mut session = FocusSession::new("doc");
        let targets: Vec<Target> = (0..4).map(|i| Target::at(i, "x")).collect();
        for (id, p, f) in [("t1", 0.0, 5.0), ("t2", 10.0, 8.0), ("t3", 25.0, 60.0)] {
            session.touch(Participant::Presenter, id, p);
            session.touch(Participant::Follower, id, f);
        }
        let snap = session.score(&targets);
        assert_eq!(snap.within_tolerance, 2);
        assert_eq!(snap.focus_percent, 50.0);

        let summary = session.summary();
        assert_eq!(summary.presenter_touches, 3);
        assert_eq!(summary.follower_touches, 3);
    }

    #[test]
    fn test_participant_names() {
        assert_eq!("teacher".parse::<Participant>().unwrap(), Participant::Presenter);
        assert_eq!("student".parse::<Participant>().unwrap(), Participant::Follower);
        assert!("observer".parse::<Participant>().is_err());

        let p: Participant = serde_json::from_str("\"student\"").unwrap();
        assert_eq!(p, Participant::Follower);
        assert_eq!(serde_json::to_string(&Participant::Presenter).unwrap(), "\"presenter\"");
    }
}
