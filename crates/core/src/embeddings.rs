use crate::error::Result;
use providers::{EmbeddingProvider, ProviderError};
use tracing::debug;

/// Embeds `texts` in batches of `batch_size`, preserving input order.
///
/// Fails if any batch errors or comes back with the wrong number of vectors.
pub async fn embed_all(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let batch_size = batch_size.max(1);
    let mut vectors = Vec::with_capacity(texts.len());
    for (n, batch) in texts.chunks(batch_size).enumerate() {
        let resp = provider.embed(batch).await?;
        if resp.vectors.len() != batch.len() {
            return Err(ProviderError::InvalidResponse(format!(
                "{} embeddings for a batch of {}",
                resp.vectors.len(),
                batch.len()
            ))
            .into());
        }
        vectors.extend(resp.vectors);
        debug!(batch = n, embedded = vectors.len(), total = texts.len(), "embedded batch");
    }
    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use providers::EmbedResponse;

    struct Short;

    #[async_trait::async_trait]
    impl EmbeddingProvider for Short {
        async fn embed(
            &self,
            _texts: &[String],
        ) -> std::result::Result<EmbedResponse, ProviderError> {
            Ok(EmbedResponse { vectors: vec![] })
        }
    }

    #[tokio::test]
    async fn count_mismatch_is_an_embedding_error() {
        let err = embed_all(&Short, &["a".to_string()], 8).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(ProviderError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn empty_input_makes_no_calls() {
        let out = embed_all(&Short, &[], 8).await.unwrap();
        assert!(out.is_empty());
    }
}
