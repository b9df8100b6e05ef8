//! Provider abstractions for text embeddings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod openai;
pub mod retry;
pub mod stub;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Permanent failure; retrying will not help.
    #[error("request failed: {0}")]
    RequestFailed(String),
    /// Rate limits, 5xx responses, dropped connections.
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("provider timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_) | ProviderError::Timeout(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub vectors: Vec<Vec<f32>>,
}

#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds `texts` in order; one vector per input.
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let resp = self.embed(&[text.to_string()]).await?;
        resp.vectors
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("no embedding returned".into()))
    }
}

#[async_trait::async_trait]
impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for Arc<P> {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
        (**self).embed(texts).await
    }
}

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    embeddings: HashMap<String, Arc<dyn EmbeddingProvider>>,
    pub preferred_embedding: Option<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embedding(mut self, name: &str, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embeddings.insert(name.to_string(), provider);
        self
    }

    pub fn set_preferred_embedding(mut self, name: &str) -> Self {
        self.preferred_embedding = Some(name.to_string());
        self
    }

    pub fn embedding(
        &self,
        name: Option<&str>,
    ) -> Result<Arc<dyn EmbeddingProvider>, ProviderError> {
        let key = name
            .map(str::to_string)
            .or_else(|| self.preferred_embedding.clone())
            .ok_or_else(|| {
                ProviderError::UnknownProvider("no embedding provider configured".into())
            })?;
        self.embeddings
            .get(&key)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownProvider(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StaticProvider;

    #[test]
    fn registry_falls_back_to_preferred() {
        let stub: Arc<dyn EmbeddingProvider> =
            Arc::new(StaticProvider::new([("a", vec![1.0, 0.0])]));
        let reg = ProviderRegistry::new()
            .with_embedding("static", stub)
            .set_preferred_embedding("static");
        assert!(reg.embedding(None).is_ok());
        assert!(matches!(
            reg.embedding(Some("openai")),
            Err(ProviderError::UnknownProvider(name)) if name == "openai"
        ));
    }

    #[test]
    fn registry_without_preference_errors() {
        let reg = ProviderRegistry::new();
        assert!(reg.embedding(None).is_err());
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(ProviderError::Transient("503".into()).is_transient());
        assert!(ProviderError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(!ProviderError::RequestFailed("401".into()).is_transient());
        assert!(!ProviderError::InvalidResponse("short".into()).is_transient());
    }

    #[tokio::test]
    async fn embed_one_unwraps_single_vector() {
        let stub = StaticProvider::new([("hello", vec![0.5, 0.5])]);
        let v = stub.embed_one("hello").await.unwrap();
        assert_eq!(v, vec![0.5, 0.5]);
    }
}
