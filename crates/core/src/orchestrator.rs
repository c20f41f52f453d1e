use crate::chunking::{prepare_document, LabeledDocument};
use crate::embeddings::Embedder;
use crate::generator::{Completer, Generator};
use crate::index::FlatL2Index;
use crate::ingest::prepare_files;
use crate::models::{Answer, AssistantOptions, ChatTurn, DocumentSummary, UploadReport};
use crate::traits::VectorIndex;
use crate::SessionError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Everything one user accumulates between resets: the index, the chat
/// history and the current suggested questions.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    index: Option<FlatL2Index>,
    documents: Vec<String>,
    history: Vec<ChatTurn>,
    suggested_questions: Vec<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            index: None,
            documents: Vec::new(),
            history: Vec::new(),
            suggested_questions: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn has_documents(&self) -> bool {
        self.index.as_ref().is_some_and(|index| !index.is_empty())
    }

    /// Every indexed chunk, in upload order.
    pub fn chunks(&self) -> &[String] {
        self.index.as_ref().map(FlatL2Index::chunks).unwrap_or_default()
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn suggested_questions(&self) -> &[String] {
        &self.suggested_questions
    }

    /// Drops all documents, history and suggestions. The id is kept.
    pub fn reset(&mut self) {
        self.index = None;
        self.documents.clear();
        self.history.clear();
        self.suggested_questions.clear();
    }
}

/// Wires cleaner, chunker, embedder, index and generator into the upload,
/// ask and summarize flows. One assistant serves any number of sessions.
pub struct Assistant<E, C>
where
    E: Embedder,
    C: Completer,
{
    embedder: E,
    generator: Generator<C>,
    options: AssistantOptions,
}

impl<E, C> Assistant<E, C>
where
    E: Embedder,
    C: Completer,
{
    pub fn new(embedder: E, generator: Generator<C>, options: AssistantOptions) -> Self {
        Self {
            embedder,
            generator,
            options,
        }
    }

    pub fn options(&self) -> &AssistantOptions {
        &self.options
    }

    pub fn generator(&self) -> &Generator<C> {
        &self.generator
    }

    pub fn new_session(&self) -> Session {
        Session::new()
    }

    /// Loads, chunks and indexes files into the session.
    ///
    /// Any unreadable file aborts the upload before the index is touched.
    pub async fn upload(
        &self,
        session: &mut Session,
        paths: &[PathBuf],
    ) -> Result<UploadReport, SessionError> {
        let documents = prepare_files(paths, self.options.chunking)?;
        self.upload_documents(session, documents).await
    }

    /// Same as [`Assistant::upload`] for text that is already in memory.
    pub async fn upload_text(
        &self,
        session: &mut Session,
        name: &str,
        raw_text: &str,
    ) -> Result<UploadReport, SessionError> {
        let document = prepare_document(name, raw_text, self.options.chunking);
        self.upload_documents(session, vec![document]).await
    }

    /// Embeds and appends labeled documents, then replaces the suggested
    /// questions with ones drawn from this upload.
    pub async fn upload_documents(
        &self,
        session: &mut Session,
        documents: Vec<LabeledDocument>,
    ) -> Result<UploadReport, SessionError> {
        let summaries = documents
            .iter()
            .map(|document| DocumentSummary {
                name: document.name.clone(),
                chunk_count: document.chunks.len(),
            })
            .collect::<Vec<_>>();
        let names = documents
            .iter()
            .map(|document| document.name.clone())
            .collect::<Vec<_>>();
        let chunks = documents
            .into_iter()
            .flat_map(|document| document.chunks)
            .collect::<Vec<_>>();

        if chunks.is_empty() {
            info!(session = %session.id, documents = names.len(), "upload produced no chunks");
            return Ok(UploadReport {
                documents: summaries,
                chunks_added: 0,
                total_chunks: session.chunks().len(),
                suggested_questions: session.suggested_questions.clone(),
            });
        }

        let vectors = self.embedder.embed_batch(&chunks).await?;
        let dimension = self.embedder.dimensions();
        let index = session
            .index
            .get_or_insert_with(|| FlatL2Index::new(dimension));
        index.add(&vectors, &chunks)?;
        let total_chunks = index.len();
        session.documents.extend(names);

        info!(
            session = %session.id,
            documents = summaries.len(),
            chunks_added = chunks.len(),
            total_chunks,
            "documents indexed"
        );

        session.suggested_questions = self.generator.generate_questions(&chunks).await?;

        Ok(UploadReport {
            documents: summaries,
            chunks_added: chunks.len(),
            total_chunks,
            suggested_questions: session.suggested_questions.clone(),
        })
    }

    /// Rewrites the question, retrieves the nearest chunks and answers from
    /// them. The original question goes into the history.
    pub async fn ask(&self, session: &mut Session, question: &str) -> Result<Answer, SessionError> {
        let index = match session.index.as_ref() {
            Some(index) if !index.is_empty() => index,
            _ => return Err(SessionError::NoDocuments),
        };
        if question.trim().is_empty() {
            return Err(SessionError::EmptyQuestion);
        }

        let rewritten_query = self.generator.rewrite_query(question).await?;
        let query_vector = self.embedder.embed_query(&rewritten_query).await?;
        let chunks = index.search(&query_vector, self.options.top_k)?;
        debug!(
            session = %session.id,
            rewritten = %rewritten_query,
            retrieved = chunks.len(),
            "context retrieved"
        );

        let answer = self
            .generator
            .generate_answer(&rewritten_query, &chunks)
            .await?;

        session.history.push(ChatTurn {
            question: question.to_string(),
            answer: answer.clone(),
            asked_at: Utc::now(),
        });

        Ok(Answer {
            question: question.to_string(),
            rewritten_query,
            answer,
            chunks,
        })
    }

    /// Summarizes every chunk in the session.
    pub async fn summarize(&self, session: &Session) -> Result<String, SessionError> {
        if !session.has_documents() {
            return Err(SessionError::NoDocuments);
        }

        Ok(self.generator.summarize_document(session.chunks()).await?)
    }
}

/// Isolated sessions keyed by id. Each session sits behind its own lock so
/// one user's request never blocks another's.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> Uuid {
        let session = Session::new();
        let id = session.id();
        self.sessions
            .lock()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<Session>>> {
        self.sessions.lock().await.get(&id).cloned()
    }

    /// Ends a session and drops its state.
    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.lock().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
