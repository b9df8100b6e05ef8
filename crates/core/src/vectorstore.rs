//! In-memory labeled vector index with exact k-nearest-neighbor search.

use crate::embeddings;
use crate::error::{Error, Result};
use crate::models::{Document, LabeledExample};
use providers::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use tracing::info;

/// Distance used for both build-time and query-time comparisons.
///
/// Smaller is closer for every variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    SquaredEuclidean,
    /// `1 - cos(a, b)`; a zero vector is at distance 1 from everything.
    Cosine,
}

impl DistanceMetric {
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::SquaredEuclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| {
                    let d = x - y;
                    d * d
                })
                .sum(),
            DistanceMetric::Cosine => {
                let (mut dot, mut na, mut nb) = (0.0f32, 0.0f32, 0.0f32);
                for (x, y) in a.iter().zip(b) {
                    dot += x * y;
                    na += x * x;
                    nb += y * y;
                }
                if na == 0.0 || nb == 0.0 {
                    return 1.0;
                }
                1.0 - dot / (na.sqrt() * nb.sqrt())
            }
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMetric::SquaredEuclidean => f.write_str("squared_euclidean"),
            DistanceMetric::Cosine => f.write_str("cosine"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<'a> {
    pub document: &'a Document,
    pub distance: f32,
}

/// Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    metric: DistanceMetric,
    dimension: Option<usize>,
    documents: Vec<Document>,
}

impl VectorIndex {
    pub fn empty(metric: DistanceMetric) -> Self {
        Self {
            metric,
            dimension: None,
            documents: Vec::new(),
        }
    }

    /// Builds an index from already-embedded documents, enforcing a single dimension.
    pub fn from_documents(documents: Vec<Document>, metric: DistanceMetric) -> Result<Self> {
        let dimension = documents.first().map(|d| d.embedding.len());
        if let Some(dim) = dimension {
            if let Some((row, doc)) = documents
                .iter()
                .enumerate()
                .find(|(_, d)| d.embedding.len() != dim)
            {
                return Err(Error::Data(format!(
                    "document {} has dimension {}, expected {}",
                    row,
                    doc.embedding.len(),
                    dim
                )));
            }
        }
        Ok(Self {
            metric,
            dimension,
            documents,
        })
    }

    /// Embeds every example and builds the index. Any failure aborts the whole build.
    pub async fn build_from_corpus(
        examples: Vec<LabeledExample>,
        provider: &dyn EmbeddingProvider,
        metric: DistanceMetric,
        batch_size: usize,
    ) -> Result<Self> {
        let texts: Vec<String> = examples.iter().map(|e| e.text.clone()).collect();
        let vectors = embeddings::embed_all(provider, &texts, batch_size).await?;
        let documents = examples
            .into_iter()
            .zip(vectors)
            .map(|(example, embedding)| Document {
                text: example.text,
                label: example.label,
                embedding,
            })
            .collect();
        let index = Self::from_documents(documents, metric)?;
        info!(
            documents = index.len(),
            dimension = index.dimension().unwrap_or(0),
            metric = %metric,
            "vector index built"
        );
        Ok(index)
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Returns the `min(k, len)` nearest documents, nearest first.
    ///
    /// Equal distances keep insertion order.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor<'_>>> {
        if k == 0 || self.documents.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(dim) = self.dimension {
            if vector.len() != dim {
                return Err(Error::Data(format!(
                    "query vector has dimension {}, index expects {}",
                    vector.len(),
                    dim
                )));
            }
        }

        let mut scored: Vec<(usize, f32)> = self
            .documents
            .iter()
            .enumerate()
            .map(|(i, doc)| (i, self.metric.distance(vector, &doc.embedding)))
            .collect();

        let by_distance_then_position = |a: &(usize, f32), b: &(usize, f32)| -> Ordering {
            a.1.total_cmp(&b.1).then(a.0.cmp(&b.0))
        };

        let k = k.min(scored.len());
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, by_distance_then_position);
            scored.truncate(k);
        }
        scored.sort_unstable_by(by_distance_then_position);

        Ok(scored
            .into_iter()
            .map(|(i, distance)| Neighbor {
                document: &self.documents[i],
                distance,
            })
            .collect())
    }
}
