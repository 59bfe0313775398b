//! Nearest-neighbor matching with an absolute acceptance gate.
//!
//! Matching is two independent steps: find the nearest roster entry, then
//! decide whether that distance is close enough to be an identification.
//! A single-person roster would otherwise claim every stranger.

use crate::roster::{Roster, RosterEntry};
use crate::types::{Embedding, MatchResult};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum MatchError {
    #[error("probe has {actual} dimensions, roster has {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Strategy for comparing a probe embedding against the roster.
pub trait Matcher {
    fn compare(&self, probe: &Embedding, roster: &Roster) -> Result<MatchResult, MatchError>;
}

/// Euclidean nearest-neighbor matcher gated by a maximum distance.
#[derive(Debug, Clone, Copy)]
pub struct EuclideanMatcher {
    /// Largest distance still accepted as an identification.
    pub threshold: f32,
}

impl EuclideanMatcher {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl Matcher for EuclideanMatcher {
    fn compare(&self, probe: &Embedding, roster: &Roster) -> Result<MatchResult, MatchError> {
        if let Some(expected) = roster.dimension() {
            if probe.dim() != expected {
                return Err(MatchError::DimensionMismatch {
                    expected,
                    actual: probe.dim(),
                });
            }
        }

        let Some((entry, distance)) = nearest(probe, roster) else {
            return Ok(MatchResult::unknown(None));
        };

        if admit(distance, self.threshold) {
            Ok(MatchResult {
                identity: Some(entry.identity.clone()),
                distance: Some(distance),
            })
        } else {
            Ok(MatchResult::unknown(Some(distance)))
        }
    }
}

/// Roster entry closest to `probe`, with its distance.
///
/// Ties go to the entry that comes first in roster order. NaN distances
/// never win. Returns `None` for an empty roster.
pub fn nearest<'r>(probe: &Embedding, roster: &'r Roster) -> Option<(&'r RosterEntry, f32)> {
    let mut best: Option<(&RosterEntry, f32)> = None;
    for entry in roster.entries() {
        let distance = probe.euclidean_distance(&entry.embedding);
        let closer = match best {
            None => !distance.is_nan(),
            // Strict: an equal distance never displaces an earlier entry.
            Some((_, best_distance)) => distance < best_distance,
        };
        if closer {
            best = Some((entry, distance));
        }
    }
    best
}

/// Whether a nearest-neighbor distance is close enough to accept.
pub fn admit(distance: f32, threshold: f32) -> bool {
    distance <= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(values: &[f32]) -> Embedding {
        Embedding::new(values.to_vec())
    }

    #[test]
    fn test_empty_roster_is_unknown_without_distance() {
        let result = EuclideanMatcher::new(0.6)
            .compare(&e(&[1.0, 2.0, 3.0]), &Roster::default())
            .unwrap();
        assert_eq!(result, MatchResult::unknown(None));
    }

    #[test]
    fn test_nearest_picks_minimum() {
        let roster = Roster::from_entries([
            ("far", e(&[10.0, 0.0])),
            ("near", e(&[1.0, 0.0])),
            ("mid", e(&[3.0, 0.0])),
        ]);
        let (entry, distance) = nearest(&e(&[0.0, 0.0]), &roster).unwrap();
        assert_eq!(entry.identity, "near");
        assert!((distance - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_tie_goes_to_first_in_roster_order() {
        let roster = Roster::from_entries([
            ("left", e(&[-1.0, 0.0])),
            ("right", e(&[1.0, 0.0])),
        ]);
        let matcher = EuclideanMatcher::new(2.0);
        for _ in 0..5 {
            let result = matcher.compare(&e(&[0.0, 0.0]), &roster).unwrap();
            assert_eq!(result.identity.as_deref(), Some("left"));
        }
    }

    #[test]
    fn test_threshold_rejects_nearest_candidate() {
        let roster = Roster::from_entries([("only", e(&[0.55, 0.0]))]);
        let result = EuclideanMatcher::new(0.5)
            .compare(&e(&[0.0, 0.0]), &roster)
            .unwrap();
        assert!(!result.is_known());
        let distance = result.distance.unwrap();
        assert!((distance - 0.55).abs() < 1e-6);
    }

    #[test]
    fn test_distance_equal_to_threshold_is_accepted() {
        assert!(admit(0.5, 0.5));
        assert!(!admit(0.51, 0.5));
        assert!(!admit(f32::NAN, 0.5));
    }

    #[test]
    fn test_accepts_within_threshold() {
        let roster = Roster::from_entries([("alice", e(&[0.3, 0.0])), ("bob", e(&[0.0, 5.0]))]);
        let result = EuclideanMatcher::new(0.6)
            .compare(&e(&[0.0, 0.0]), &roster)
            .unwrap();
        assert_eq!(result.identity.as_deref(), Some("alice"));
        assert!((result.distance.unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_nan_distance_never_wins() {
        let roster = Roster::from_entries([("a", e(&[1.0, 0.0])), ("b", e(&[2.0, 0.0]))]);
        let probe = e(&[f32::NAN, 0.0]);
        assert!(nearest(&probe, &roster).is_none());
        let result = EuclideanMatcher::new(10.0).compare(&probe, &roster).unwrap();
        assert_eq!(result, MatchResult::unknown(None));
    }

    #[test]
    fn test_dimension_mismatch_is_error() {
        let roster = Roster::from_entries([("a", e(&[1.0, 0.0]))]);
        let err = EuclideanMatcher::new(1.0)
            .compare(&e(&[1.0, 0.0, 0.0]), &roster)
            .unwrap_err();
        assert_eq!(err, MatchError::DimensionMismatch { expected: 2, actual: 3 });
    }
}
