//! Prompt orchestration over an external chat-completion model.
//!
//! [`Completer`] is the only outbound LLM boundary. [`Generator`] builds the
//! rewrite, grounded-answer, summary and suggested-question prompts on top of
//! it; [`ChatCompletionsClient`] talks to any OpenAI-compatible endpoint.

use crate::embeddings::{endpoint_url, read_credential};
use crate::error::SearchError;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_LLM_ENDPOINT: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_API_KEY_ENV: &str = "GROQ_API_KEY";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const NOT_FOUND_ANSWER: &str = "Information not found in the uploaded documents.";

pub const REWRITE_TEMPERATURE: f32 = 0.0;
pub const ANSWER_TEMPERATURE: f32 = 0.2;
pub const SUMMARY_TEMPERATURE: f32 = 0.3;
pub const QUESTIONS_TEMPERATURE: f32 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, SearchError>;
}

#[derive(Debug, Clone)]
pub struct ChatCompletionsConfig {
    pub endpoint: String,
    pub api_key_env: String,
    pub timeout: Duration,
}

impl Default for ChatCompletionsConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_LLM_ENDPOINT.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// `POST {endpoint}/chat/completions` with bearer auth. No retries.
pub struct ChatCompletionsClient {
    url: url::Url,
    api_key: String,
    client: Client,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

impl ChatCompletionsClient {
    /// Reads the API key from the configured environment variable.
    ///
    /// # Errors
    ///
    /// [`SearchError::MissingCredential`] when the variable is unset or blank.
    pub fn from_env(config: ChatCompletionsConfig) -> Result<Self, SearchError> {
        let api_key = read_credential(&config.api_key_env)?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(
        config: ChatCompletionsConfig,
        api_key: impl Into<String>,
    ) -> Result<Self, SearchError> {
        let url = endpoint_url(&config.endpoint, "chat/completions")?;
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            url,
            api_key: api_key.into(),
            client,
        })
    }
}

#[async_trait]
impl Completer for ChatCompletionsClient {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, SearchError> {
        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest {
                model,
                messages,
                temperature,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Upstream {
                backend: "chat-completions".to_string(),
                details: format!("{status}: {body}"),
            });
        }

        let payload: Value = response.json().await?;
        completion_text(&payload)
    }
}

fn completion_text(payload: &Value) -> Result<String, SearchError> {
    payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SearchError::InvalidResponse {
            backend: "chat-completions".to_string(),
            details: "missing choices[0].message.content".to_string(),
        })
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub qa_model: String,
    pub summary_model: String,
    pub summary_batch_size: usize,
    pub question_context_chunks: usize,
    pub max_concurrent_requests: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            qa_model: DEFAULT_MODEL.to_string(),
            summary_model: DEFAULT_MODEL.to_string(),
            summary_batch_size: 5,
            question_context_chunks: 5,
            max_concurrent_requests: 4,
        }
    }
}

pub struct Generator<C: Completer> {
    completer: C,
    config: GeneratorConfig,
}

impl Generator<ChatCompletionsClient> {
    pub fn from_env(
        client: ChatCompletionsConfig,
        config: GeneratorConfig,
    ) -> Result<Self, SearchError> {
        Ok(Self::new(ChatCompletionsClient::from_env(client)?, config))
    }
}

impl<C: Completer> Generator<C> {
    pub fn new(completer: C, config: GeneratorConfig) -> Self {
        Self { completer, config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn completer(&self) -> &C {
        &self.completer
    }

    async fn ask_model(
        &self,
        model: &str,
        prompt: String,
        temperature: f32,
    ) -> Result<String, SearchError> {
        let reply = self
            .completer
            .complete(model, &[ChatMessage::user(prompt)], temperature)
            .await?;
        Ok(reply.trim().to_string())
    }

    /// Rephrases a question for retrieval.
    pub async fn rewrite_query(&self, query: &str) -> Result<String, SearchError> {
        self.ask_model(&self.config.qa_model, rewrite_prompt(query), REWRITE_TEMPERATURE)
            .await
    }

    /// Answers strictly from `chunks`, citing `[Chunk i]` numbers.
    pub async fn generate_answer(
        &self,
        query: &str,
        chunks: &[String],
    ) -> Result<String, SearchError> {
        self.ask_model(&self.config.qa_model, answer_prompt(query, chunks), ANSWER_TEMPERATURE)
            .await
    }

    /// Map-reduce summary: one call per batch, then one call combining them.
    pub async fn summarize_document(&self, chunks: &[String]) -> Result<String, SearchError> {
        let batch_size = self.config.summary_batch_size.max(1);
        let concurrency = self.config.max_concurrent_requests.max(1);

        let partials: Vec<String> = stream::iter(chunks.chunks(batch_size))
            .map(|batch| {
                self.ask_model(
                    &self.config.summary_model,
                    batch_summary_prompt(batch),
                    SUMMARY_TEMPERATURE,
                )
            })
            .buffered(concurrency)
            .try_collect()
            .await?;

        info!(
            chunk_count = chunks.len(),
            batch_count = partials.len(),
            "partial summaries ready"
        );

        self.ask_model(
            &self.config.summary_model,
            combine_summaries_prompt(&partials.join("\n\n")),
            SUMMARY_TEMPERATURE,
        )
        .await
    }

    /// Suggests questions from the leading chunks of a document set.
    pub async fn generate_questions(&self, chunks: &[String]) -> Result<Vec<String>, SearchError> {
        let context_len = chunks.len().min(self.config.question_context_chunks);
        let reply = self
            .ask_model(
                &self.config.qa_model,
                questions_prompt(&chunks[..context_len]),
                QUESTIONS_TEMPERATURE,
            )
            .await?;

        let questions = parse_questions(&reply);
        debug!(count = questions.len(), "suggested questions parsed");
        Ok(questions)
    }
}

fn rewrite_prompt(query: &str) -> String {
    format!(
        "\nRewrite the following question to be precise and optimized\n\
         for retrieving relevant information from a document.\n\n\
         Question:\n{query}\n\n\
         Rewritten question:\n"
    )
}

fn answer_prompt(query: &str, chunks: &[String]) -> String {
    let mut context = String::new();
    for (index, chunk) in chunks.iter().enumerate() {
        context.push_str(&format!("[Chunk {}] {chunk}\n\n", index + 1));
    }

    format!(
        "\nYou are a document-grounded AI assistant.\n\n\
         RULES:\n\
         - Answer ONLY using the provided context.\n\
         - Do NOT use external knowledge.\n\
         - If the answer is not present, say:\n  \"{NOT_FOUND_ANSWER}\"\n\
         - Mention chunk numbers used at the end.\n\n\
         Context:\n{context}\n\n\
         Question:\n{query}\n\n\
         Answer:\n"
    )
}

fn batch_summary_prompt(batch: &[String]) -> String {
    format!(
        "\nSummarize the following content in concise bullet points.\n\
         Focus only on key ideas.\n\n\
         Content:\n{}\n\n\
         Summary:\n",
        batch.join("\n\n")
    )
}

fn combine_summaries_prompt(summaries: &str) -> String {
    format!(
        "\nCombine the following summaries into a single,\n\
         clear and concise document summary.\n\n\
         Summaries:\n{summaries}\n\n\
         Final Summary:\n"
    )
}

fn questions_prompt(chunks: &[String]) -> String {
    format!(
        "\nBased on the following document content,\n\
         generate 5 useful questions a student might ask.\n\n\
         Content:\n{}\n\n\
         Questions:\n",
        chunks.join("\n\n")
    )
}

/// One question per non-empty line, with bullet dashes and spaces trimmed.
/// Numbering such as `1.` is left in place.
pub fn parse_questions(reply: &str) -> Vec<String> {
    reply
        .split('\n')
        .map(|line| line.trim().trim_matches(|c| c == '-' || c == ' ').trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
