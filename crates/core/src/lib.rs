pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod index;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod preprocessing;
pub mod traits;

pub use chunking::{
    chunk_label, chunk_words, label_chunks, prepare_document, ChunkingConfig, LabeledDocument,
};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, HttpEmbedder, HttpEmbedderConfig,
    DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{IngestError, SearchError, SessionError};
pub use extractor::{load_document, DocumentKind, PageText, PdfExtractor};
pub use generator::{
    ChatCompletionsClient, ChatCompletionsConfig, ChatMessage, Completer, Generator,
    GeneratorConfig, Role,
};
pub use index::FlatL2Index;
pub use ingest::{discover_documents, prepare_files};
pub use models::{Answer, AssistantOptions, ChatTurn, DocumentSummary, UploadReport};
pub use orchestrator::{Assistant, Session, SessionStore};
pub use preprocessing::clean_text;
pub use traits::VectorIndex;
