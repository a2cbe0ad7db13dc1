//! Synchronization scoring over presenter and follower first touches.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::document::Target;

/// Time delta for one target that both participants reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetDelta {
    pub target_id: String,
    /// Absolute difference in seconds, rounded to milliseconds.
    pub seconds: f64,
}

/// Derived score; computed fresh on every request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub total_targets: usize,
    pub within_tolerance: usize,
    pub tolerance_seconds: f64,
    /// Share of all targets within tolerance, rounded to one decimal
    /// (exact ties round half to even).
    pub focus_percent: f64,
    /// Deltas in target order, only for targets touched by both sides.
    pub per_target_delta_seconds: Vec<TargetDelta>,
}

impl ScoreSnapshot {
    pub fn delta_for(&self, target_id: &str) -> Option<f64> {
        self.per_target_delta_seconds
            .iter()
            .find(|d| d.target_id == target_id)
            .map(|d| d.seconds)
    }
}

/// Score follower pacing against the presenter.
///
/// Targets missing either touch still count toward `total_targets` but never
/// toward `within_tolerance`. The tolerance boundary is inclusive.
pub fn score(
    targets: &[Target],
    presenter: &HashMap<String, f64>,
    follower: &HashMap<String, f64>,
    tolerance_seconds: f64,
) -> ScoreSnapshot {
    let mut within_tolerance = 0;
    let mut deltas = Vec::new();

    for target in targets {
        let (Some(p), Some(f)) = (presenter.get(&target.id), follower.get(&target.id)) else {
            continue;
        };
        let delta = (f - p).abs();
        if delta <= tolerance_seconds {
            within_tolerance += 1;
        }
        deltas.push(TargetDelta {
            target_id: target.id.clone(),
            seconds: round_to(delta, 3),
        });
    }

    let total_targets = targets.len();
    let percent = if total_targets > 0 {
        within_tolerance as f64 / total_targets as f64 * 100.0
    } else {
        0.0
    };

    ScoreSnapshot {
        total_targets,
        within_tolerance,
        tolerance_seconds,
        focus_percent: round_to(percent, 1),
        per_target_delta_seconds: deltas,
    }
}

/// Round to `decimals` places from the exact binary value; exact ties go to
/// the even digit (`0.125` becomes `0.12`, `6.25` becomes `6.2`).
fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{value:.decimals$}").parse().unwrap_or(value)
}
