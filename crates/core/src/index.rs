use crate::traits::VectorIndex;
use crate::SearchError;
use tracing::debug;

/// Exact nearest-neighbor index over squared Euclidean distance.
///
/// Vectors live in one contiguous buffer, row `i` belonging to `chunks[i]`.
#[derive(Debug, Clone)]
pub struct FlatL2Index {
    dimension: usize,
    vectors: Vec<f32>,
    chunks: Vec<String>,
}

impl FlatL2Index {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
            chunks: Vec::new(),
        }
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    fn row(&self, position: usize) -> &[f32] {
        let start = position * self.dimension;
        &self.vectors[start..start + self.dimension]
    }

    /// Row positions of the `top_k` nearest vectors with their distances.
    /// Equal distances keep insertion order.
    fn nearest(&self, query: &[f32], top_k: usize) -> Vec<(usize, f32)> {
        // one row per chunk, empty when the width is zero
        let mut scored = (0..self.len())
            .map(|position| (position, squared_l2(query, self.row(position))))
            .collect::<Vec<_>>();

        scored.sort_by(|left, right| left.1.total_cmp(&right.1));
        scored.truncate(top_k);
        scored
    }
}

impl VectorIndex for FlatL2Index {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.chunks.len()
    }

    fn add(&mut self, vectors: &[Vec<f32>], chunks: &[String]) -> Result<(), SearchError> {
        if vectors.len() != chunks.len() {
            return Err(SearchError::DimensionMismatch {
                expected: chunks.len(),
                actual: vectors.len(),
            });
        }

        if let Some(bad) = vectors.iter().find(|vector| vector.len() != self.dimension) {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }

        self.vectors.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.vectors.extend_from_slice(vector);
        }
        self.chunks.extend_from_slice(chunks);

        debug!(added = chunks.len(), total = self.chunks.len(), "index extended");
        Ok(())
    }

    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<String>, SearchError> {
        if self.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        if query.len() != self.dimension {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        Ok(collect_chunks(&self.chunks, self.nearest(query, top_k)))
    }
}

/// Maps neighbor positions to chunks, skipping positions with no chunk.
fn collect_chunks(chunks: &[String], neighbors: Vec<(usize, f32)>) -> Vec<String> {
    neighbors
        .into_iter()
        .filter_map(|(position, _distance)| chunks.get(position).cloned())
        .collect()
}

pub fn squared_l2(left: &[f32], right: &[f32]) -> f32 {
    left.iter()
        .zip(right.iter())
        .map(|(a, b)| {
            let delta = a - b;
            delta * delta
        })
        .sum()
}
