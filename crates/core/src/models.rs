use crate::chunking::ChunkingConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

/// A grounded answer with the chunks it was generated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub rewritten_query: String,
    pub answer: String,
    pub chunks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UploadReport {
    pub documents: Vec<DocumentSummary>,
    pub chunks_added: usize,
    pub total_chunks: usize,
    pub suggested_questions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentSummary {
    pub name: String,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct AssistantOptions {
    pub chunking: ChunkingConfig,
    pub top_k: usize,
}

impl Default for AssistantOptions {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            top_k: DEFAULT_TOP_K,
        }
    }
}
