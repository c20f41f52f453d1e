use crate::SearchError;

/// Append-only store of embedding vectors paired by position with their chunks.
pub trait VectorIndex {
    fn dimension(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends every pair or none of them.
    fn add(&mut self, vectors: &[Vec<f32>], chunks: &[String]) -> Result<(), SearchError>;

    /// Returns up to `top_k` chunks, nearest first.
    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<String>, SearchError>;
}
