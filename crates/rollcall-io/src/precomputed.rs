//! Embedding provider over precomputed frame documents.
//!
//! Each "image" is a JSON document that already carries the located faces
//! and their embeddings, as produced by an offline detection pass:
//!
//! ```json
//! {"faces": [{"bbox": {"x": 10, "y": 20, "width": 80, "height": 80}, "embedding": [0.1, ...]}]}
//! ```

use rollcall_core::{BoundingBox, Embedding, EmbeddingProvider, ProviderError};
use serde::{Deserialize, Serialize};

/// One located face and its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceDocument {
    pub bbox: BoundingBox,
    pub embedding: Embedding,
}

/// All faces found in one image or frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameDocument {
    #[serde(default)]
    pub faces: Vec<FaceDocument>,
}

impl FrameDocument {
    pub fn parse(image: &[u8]) -> Result<Self, ProviderError> {
        serde_json::from_slice(image).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

/// Reads faces straight out of [`FrameDocument`]s.
#[derive(Debug, Default)]
pub struct PrecomputedProvider;

impl EmbeddingProvider for PrecomputedProvider {
    fn locate_faces(&mut self, image: &[u8]) -> Result<Vec<BoundingBox>, ProviderError> {
        Ok(FrameDocument::parse(image)?
            .faces
            .into_iter()
            .map(|f| f.bbox)
            .collect())
    }

    fn embed(
        &mut self,
        image: &[u8],
        regions: &[BoundingBox],
    ) -> Result<Vec<Embedding>, ProviderError> {
        let doc = FrameDocument::parse(image)?;
        // Each document face answers at most one region, so faces sharing a
        // box still map one-to-one in document order.
        let mut taken = vec![false; doc.faces.len()];
        let mut embeddings = Vec::with_capacity(regions.len());
        for region in regions {
            let idx = (0..doc.faces.len())
                .find(|&i| !taken[i] && doc.faces[i].bbox == *region)
                .ok_or_else(|| ProviderError::Failed(format!("no embedding for region {region:?}")))?;
            taken[idx] = true;
            embeddings.push(doc.faces[idx].embedding.clone());
        }
        Ok(embeddings)
    }

    fn faces(&mut self, image: &[u8]) -> Result<Vec<(BoundingBox, Embedding)>, ProviderError> {
        Ok(FrameDocument::parse(image)?
            .faces
            .into_iter()
            .map(|f| (f.bbox, f.embedding))
            .collect())
    }
}
