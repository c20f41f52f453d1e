use crate::error::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const DEFAULT: usize = 384;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

/// Maps text to fixed-width vectors. One instance serves a whole process.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| SearchError::InvalidResponse {
            backend: "embedder".to_string(),
            details: "empty embedding batch for query".to_string(),
        })
    }
}

#[async_trait]
impl<T: Embedder + ?Sized> Embedder for Box<T> {
    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError> {
        (**self).embed_batch(texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        (**self).embed_query(text).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }
}

#[derive(Debug, Clone)]
pub struct HttpEmbedderConfig {
    pub endpoint: String,
    pub model: String,
    pub dimensions: usize,
    pub api_key_env: Option<String>,
    pub timeout: Duration,
}

impl Default for HttpEmbedderConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/v1".to_string(),
            model: "all-minilm".to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            api_key_env: None,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Client for an OpenAI-compatible `/embeddings` endpoint.
pub struct HttpEmbedder {
    url: url::Url,
    model: String,
    dimensions: usize,
    api_key: Option<String>,
    client: Client,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

impl HttpEmbedder {
    /// # Errors
    ///
    /// Fails with [`SearchError::MissingCredential`] when `api_key_env` names
    /// an unset variable.
    pub fn new(config: HttpEmbedderConfig) -> Result<Self, SearchError> {
        let api_key = match &config.api_key_env {
            Some(var) => Some(read_credential(var)?),
            None => None,
        };

        let url = endpoint_url(&config.endpoint, "embeddings")?;
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            url,
            model: config.model,
            dimensions: config.dimensions,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self.client.post(self.url.clone()).json(&EmbeddingRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Upstream {
                backend: "embeddings".to_string(),
                details: format!("{status}: {body}"),
            });
        }

        let payload: Value = response.json().await?;
        let vectors = parse_embedding_response(&payload, texts.len())?;

        if let Some(bad) = vectors.iter().find(|vector| vector.len() != self.dimensions) {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimensions,
                actual: bad.len(),
            });
        }

        debug!(count = vectors.len(), model = %self.model, "embedded batch");
        Ok(vectors)
    }
}

/// Joins `path` onto an API base URL, keeping any path prefix such as `/v1`.
pub(crate) fn endpoint_url(base: &str, path: &str) -> Result<url::Url, SearchError> {
    let normalized = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{base}/")
    };
    Ok(url::Url::parse(&normalized)?.join(path)?)
}

pub(crate) fn read_credential(var: &str) -> Result<String, SearchError> {
    std::env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| SearchError::MissingCredential(var.to_string()))
}

/// Reads `data[*].embedding`, reordered by each item's `index` when present.
fn parse_embedding_response(
    payload: &Value,
    expected: usize,
) -> Result<Vec<Vec<f32>>, SearchError> {
    let invalid = |details: String| SearchError::InvalidResponse {
        backend: "embeddings".to_string(),
        details,
    };

    let items = payload
        .pointer("/data")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("missing data array".to_string()))?;

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; items.len()];
    for (position, item) in items.iter().enumerate() {
        let index = item
            .pointer("/index")
            .and_then(Value::as_u64)
            .map(|index| index as usize)
            .unwrap_or(position);
        let vector = item
            .pointer("/embedding")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid(format!("item {position} has no embedding")))?
            .iter()
            .map(|value| value.as_f64().map(|number| number as f32))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| invalid(format!("item {position} has a non-numeric embedding")))?;

        let slot = slots
            .get_mut(index)
            .ok_or_else(|| invalid(format!("item index {index} out of range")))?;
        *slot = Some(vector);
    }

    let vectors = slots
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| invalid("duplicate item index".to_string()))?;

    if vectors.len() != expected {
        return Err(invalid(format!(
            "expected {expected} embeddings, got {}",
            vectors.len()
        )));
    }

    Ok(vectors)
}
