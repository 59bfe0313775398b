//! Roster of known identities, loaded once from a directory of labeled
//! reference images.

use crate::provider::EmbeddingProvider;
use crate::types::{Embedding, UNKNOWN};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RosterLoadError {
    #[error("roster directory not found: {0}")]
    DirectoryNotFound(PathBuf),
    #[error("roster directory unreadable: {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A known identity and its reference embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub identity: String,
    pub embedding: Embedding,
}

/// Ordered, read-only collection of roster entries.
///
/// Order is significant: the matcher breaks distance ties in favor of the
/// earlier entry.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    /// Load a roster from `dir`, embedding each reference image with `provider`.
    ///
    /// Files are visited in file-name order. The identity label is the file
    /// name without its extension. Images in which no face is found (or on
    /// which the provider fails) are skipped with a warning; only a missing
    /// or unreadable directory is an error.
    pub fn load<P>(dir: &Path, provider: &mut P) -> Result<Self, RosterLoadError>
    where
        P: EmbeddingProvider + ?Sized,
    {
        if !dir.is_dir() {
            return Err(RosterLoadError::DirectoryNotFound(dir.to_path_buf()));
        }

        let unreadable = |source| RosterLoadError::Unreadable {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(unreadable)? {
            let entry = entry.map_err(unreadable)?;
            let path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if hidden || !path.is_file() {
                continue;
            }
            paths.push(path);
        }
        paths.sort();

        let mut roster = Roster::default();
        for path in &paths {
            let Some(label) = label_for(path) else {
                tracing::warn!(path = %path.display(), "skipping reference image with unusable name");
                continue;
            };

            let image = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable reference image");
                    continue;
                }
            };

            let embedding = match provider.faces(&image) {
                Ok(faces) => match faces.into_iter().next() {
                    Some((_, embedding)) => embedding,
                    None => {
                        tracing::warn!(identity = label, path = %path.display(), "no face found in reference image; identity excluded");
                        continue;
                    }
                },
                Err(e) => {
                    tracing::warn!(identity = label, path = %path.display(), error = %e, "embedding provider failed on reference image; identity excluded");
                    continue;
                }
            };

            roster.insert(label.to_string(), embedding);
        }

        tracing::info!(
            dir = %dir.display(),
            files = paths.len(),
            identities = roster.len(),
            dim = ?roster.dimension(),
            "roster loaded"
        );

        Ok(roster)
    }

    /// Build a roster from already-computed entries, applying the same
    /// label, duplicate and dimensionality rules as [`Roster::load`].
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Embedding)>,
        S: Into<String>,
    {
        let mut roster = Roster::default();
        for (identity, embedding) in entries {
            roster.insert(identity.into(), embedding);
        }
        roster
    }

    /// Add an entry. Returns `false` if the entry was rejected.
    ///
    /// A label already present keeps its position but takes the new embedding.
    fn insert(&mut self, identity: String, embedding: Embedding) -> bool {
        if identity.is_empty() || identity == UNKNOWN {
            tracing::warn!(identity = %identity, "reserved or empty identity label; entry skipped");
            return false;
        }
        if embedding.dim() == 0 {
            tracing::warn!(identity = %identity, "empty reference embedding; entry skipped");
            return false;
        }
        if let Some(dim) = self.dimension() {
            if embedding.dim() != dim {
                tracing::warn!(
                    identity = %identity,
                    expected = dim,
                    actual = embedding.dim(),
                    "reference embedding dimensionality mismatch; entry skipped"
                );
                return false;
            }
        }

        if let Some(existing) = self.entries.iter_mut().find(|e| e.identity == identity) {
            tracing::warn!(identity = %identity, "duplicate identity label; later reference image wins");
            existing.embedding = embedding;
        } else {
            self.entries.push(RosterEntry {
                identity,
                embedding,
            });
        }
        true
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn get(&self, identity: &str) -> Option<&RosterEntry> {
        self.entries.iter().find(|e| e.identity == identity)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.identity.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimensionality shared by every entry, `None` for an empty roster.
    pub fn dimension(&self) -> Option<usize> {
        self.entries.first().map(|e| e.embedding.dim())
    }
}

/// File stem as identity label.
fn label_for(path: &Path) -> Option<&str> {
    let stem = path.file_stem()?.to_str()?;
    (!stem.is_empty()).then_some(stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use crate::types::BoundingBox;

    /// Treats file contents as comma-separated faces, each face a
    /// space-separated vector. "fail" simulates a provider error.
    struct TextProvider;

    fn parse(image: &[u8]) -> Result<Vec<Embedding>, ProviderError> {
        let text = std::str::from_utf8(image).map_err(|e| ProviderError::Decode(e.to_string()))?;
        if text.trim() == "fail" {
            return Err(ProviderError::Failed("simulated".into()));
        }
        Ok(text
            .split(',')
            .filter(|f| !f.trim().is_empty())
            .map(|f| Embedding::new(f.split_whitespace().map(|v| v.parse().unwrap()).collect()))
            .collect())
    }

    impl EmbeddingProvider for TextProvider {
        fn locate_faces(&mut self, image: &[u8]) -> Result<Vec<BoundingBox>, ProviderError> {
            Ok(parse(image)?
                .iter()
                .map(|_| BoundingBox { x: 0.0, y: 0.0, width: 1.0, height: 1.0, confidence: 1.0 })
                .collect())
        }

        fn embed(&mut self, image: &[u8], _: &[BoundingBox]) -> Result<Vec<Embedding>, ProviderError> {
            parse(image)
        }
    }

    fn write(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_load_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        let err = Roster::load(&missing, &mut TextProvider).unwrap_err();
        assert!(matches!(err, RosterLoadError::DirectoryNotFound(p) if p == missing));
    }

    #[cfg(unix)]
    #[test]
    fn test_load_unreadable_directory() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let locked = tmp.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        write(&locked, "alice.png", "1 0");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not bind a privileged user.
        if std::fs::read_dir(&locked).is_ok() {
            std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let err = Roster::load(&locked, &mut TextProvider).unwrap_err();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(matches!(err, RosterLoadError::Unreadable { path, .. } if path == locked));
    }

    #[test]
    fn test_load_labels_from_file_stem_in_name_order() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "carol.png", "0 0 1");
        write(tmp.path(), "alice.jpg", "1 0 0");
        write(tmp.path(), "bob.jpeg", "0 1 0");

        let roster = Roster::load(tmp.path(), &mut TextProvider).unwrap();
        assert_eq!(roster.labels().collect::<Vec<_>>(), vec!["alice", "bob", "carol"]);
        assert_eq!(roster.dimension(), Some(3));
        assert_eq!(roster.get("bob").unwrap().embedding.values, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_load_uses_first_face_only() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "group.jpg", "1 1, 2 2, 3 3");
        let roster = Roster::load(tmp.path(), &mut TextProvider).unwrap();
        assert_eq!(roster.get("group").unwrap().embedding.values, vec![1.0, 1.0]);
    }

    #[test]
    fn test_load_skips_faceless_and_failing_images() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "alice.jpg", "1 0");
        write(tmp.path(), "blank.jpg", "");
        write(tmp.path(), "broken.jpg", "fail");
        write(tmp.path(), ".hidden.jpg", "0 1");
        std::fs::create_dir(tmp.path().join("nested")).unwrap();

        let roster = Roster::load(tmp.path(), &mut TextProvider).unwrap();
        assert_eq!(roster.labels().collect::<Vec<_>>(), vec!["alice"]);
    }

    #[test]
    fn test_load_all_faceless_yields_empty_roster() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.jpg", "");
        let roster = Roster::load(tmp.path(), &mut TextProvider).unwrap();
        assert!(roster.is_empty());
        assert_eq!(roster.dimension(), None);
    }

    #[test]
    fn test_load_duplicate_label_last_wins_keeps_position() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "alice.jpg", "1 0");
        write(tmp.path(), "alice.png", "0.5 0.5");
        write(tmp.path(), "bob.jpg", "0 1");

        let roster = Roster::load(tmp.path(), &mut TextProvider).unwrap();
        assert_eq!(roster.labels().collect::<Vec<_>>(), vec!["alice", "bob"]);
        assert_eq!(roster.get("alice").unwrap().embedding.values, vec![0.5, 0.5]);
    }

    #[test]
    fn test_reserved_label_and_dimension_mismatch_rejected() {
        let roster = Roster::from_entries([
            ("alice", Embedding::new(vec![1.0, 0.0])),
            (UNKNOWN, Embedding::new(vec![0.0, 1.0])),
            ("bob", Embedding::new(vec![0.0, 1.0, 0.0])),
            ("", Embedding::new(vec![0.0, 1.0])),
            ("carol", Embedding::new(vec![0.0, 1.0])),
        ]);
        assert_eq!(roster.labels().collect::<Vec<_>>(), vec!["alice", "carol"]);
    }
}
