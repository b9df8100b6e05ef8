//! Startup wiring: provider selection, dataset ingestion, index build.

use crate::classifier::Classifier;
use crate::config::AppConfig;
use crate::dataset;
use crate::vectorstore::VectorIndex;
use anyhow::Context;
use providers::openai::{OpenAiConfig, OpenAiProvider};
use providers::retry::{RetryPolicy, RetryingProvider};
use providers::{EmbeddingProvider, ProviderRegistry};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub fn build_registry(config: &AppConfig) -> anyhow::Result<ProviderRegistry> {
    let mut reg = ProviderRegistry::new();

    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
    let base_url = std::env::var("OPENAI_BASE_URL")
        .unwrap_or_else(|_| config.embeddings.base_url.clone());
    let provider = OpenAiProvider::new(OpenAiConfig {
        api_key,
        base_url,
        embedding_model: config.embeddings.model.clone(),
        timeout: config.embeddings.timeout(),
    })
    .context("openai provider")?;
    reg = reg.with_embedding("openai", Arc::new(provider));

    Ok(reg.set_preferred_embedding(&config.embeddings.provider))
}

pub fn retry_policy(config: &AppConfig) -> RetryPolicy {
    RetryPolicy {
        timeout: config.embeddings.timeout(),
        max_attempts: config.embeddings.max_attempts.max(1),
        base_backoff: Duration::from_millis(config.embeddings.backoff_ms),
        ..RetryPolicy::default()
    }
}

/// Resolves the configured provider and builds the classifier from the dataset on disk.
pub async fn build_classifier(config: &AppConfig) -> anyhow::Result<Classifier> {
    let registry = build_registry(config)?;
    let provider = registry
        .embedding(None)
        .context("resolve embedding provider")?;
    build_classifier_with(config, provider).await
}

/// Same as [`build_classifier`] with an explicit provider. Any failure aborts
/// startup; a partially built index is never returned.
pub async fn build_classifier_with(
    config: &AppConfig,
    provider: Arc<dyn EmbeddingProvider>,
) -> anyhow::Result<Classifier> {
    let provider: Arc<dyn EmbeddingProvider> =
        Arc::new(RetryingProvider::new(provider, retry_policy(config)));

    info!("Loading training data...");
    let path = Path::new(&config.dataset.path);
    let examples =
        dataset::load(path).with_context(|| format!("load dataset {}", path.display()))?;

    info!("Creating embeddings...");
    let index = VectorIndex::build_from_corpus(
        examples,
        provider.as_ref(),
        config.index.metric,
        config.embeddings.batch_size,
    )
    .await
    .context("build vector index")?;

    Ok(
        Classifier::new(Arc::new(index), provider, config.classification.k)
            .with_sanitizer(config.sanitize.clone()),
    )
}
