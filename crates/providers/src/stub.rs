use crate::{EmbedResponse, EmbeddingProvider, ProviderError};
use std::collections::HashMap;

/// Deterministic provider backed by a fixed text -> vector table.
///
/// Unknown texts fail with `RequestFailed`, so tests can exercise the
/// embedding error path by querying a string outside the table.
#[derive(Debug, Default, Clone)]
pub struct StaticProvider {
    table: HashMap<String, Vec<f32>>,
}

impl StaticProvider {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: Into<String>,
    {
        Self {
            table: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for StaticProvider {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
        let vectors = texts
            .iter()
            .map(|t| {
                self.table
                    .get(t)
                    .cloned()
                    .ok_or_else(|| ProviderError::RequestFailed(format!("no embedding for {t:?}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(EmbedResponse { vectors })
    }
}
