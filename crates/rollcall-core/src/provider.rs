//! Embedding provider seam.
//!
//! Face localization and embedding computation live outside this crate.
//! Anything that can turn an encoded image into face regions and one
//! embedding per region plugs in here.

use crate::types::{BoundingBox, Embedding};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("image could not be decoded: {0}")]
    Decode(String),
    #[error("provider returned {embeddings} embeddings for {regions} regions")]
    RegionMismatch { regions: usize, embeddings: usize },
    #[error("embedding failed: {0}")]
    Failed(String),
}

/// Locates faces in an image and computes their embeddings.
///
/// Implementations may be stateful (model sessions, caches), hence `&mut self`.
pub trait EmbeddingProvider {
    /// Find every face in `image`, in the provider's preferred order.
    fn locate_faces(&mut self, image: &[u8]) -> Result<Vec<BoundingBox>, ProviderError>;

    /// Compute one embedding per region, in the same order as `regions`.
    fn embed(
        &mut self,
        image: &[u8],
        regions: &[BoundingBox],
    ) -> Result<Vec<Embedding>, ProviderError>;

    /// Locate and embed in one step, pairing each region with its embedding.
    fn faces(&mut self, image: &[u8]) -> Result<Vec<(BoundingBox, Embedding)>, ProviderError> {
        let regions = self.locate_faces(image)?;
        if regions.is_empty() {
            return Ok(Vec::new());
        }
        let embeddings = self.embed(image, &regions)?;
        if embeddings.len() != regions.len() {
            return Err(ProviderError::RegionMismatch {
                regions: regions.len(),
                embeddings: embeddings.len(),
            });
        }
        Ok(regions.into_iter().zip(embeddings).collect())
    }
}
