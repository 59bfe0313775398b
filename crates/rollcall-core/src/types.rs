use serde::{Deserialize, Serialize};

/// Label reported for a face that does not match any roster entry.
pub const UNKNOWN: &str = "unknown";

/// Bounding box of a located face, in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

/// Face embedding vector (typically 128-dimensional).
///
/// Embeddings are only comparable when they come from the same provider and
/// share the same dimensionality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Number of dimensions.
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Compute Euclidean distance between two embeddings.
    ///
    /// Callers must ensure both embeddings have the same dimensionality;
    /// extra trailing dimensions on either side are ignored.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self { values }
    }
}

/// Result of matching a probe embedding against the roster.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// Label of the accepted roster entry, `None` when the face is unknown.
    pub identity: Option<String>,
    /// Distance to the nearest roster entry, `None` when nothing was compared.
    pub distance: Option<f32>,
}

impl MatchResult {
    pub fn unknown(distance: Option<f32>) -> Self {
        Self {
            identity: None,
            distance,
        }
    }

    pub fn is_known(&self) -> bool {
        self.identity.is_some()
    }

    /// Display label: the identity, or [`UNKNOWN`].
    pub fn label(&self) -> &str {
        self.identity.as_deref().unwrap_or(UNKNOWN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_distance_identical() {
        let a = Embedding::new(vec![0.5, -0.25, 1.0]);
        assert_eq!(a.euclidean_distance(&a.clone()), 0.0);
    }

    #[test]
    fn test_euclidean_distance_3_4_5() {
        let a = Embedding::new(vec![0.0, 0.0]);
        let b = Embedding::new(vec![3.0, 4.0]);
        assert!((a.euclidean_distance(&b) - 5.0).abs() < 1e-6);
        assert!((b.euclidean_distance(&a) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_match_result_label() {
        let unknown = MatchResult::unknown(Some(0.9));
        assert_eq!(unknown.label(), UNKNOWN);
        assert!(!unknown.is_known());

        let known = MatchResult {
            identity: Some("alice".into()),
            distance: Some(0.2),
        };
        assert_eq!(known.label(), "alice");
        assert!(known.is_known());
    }
}
