//! Majority-vote classification over the k nearest labeled examples.

use crate::error::{Error, Result};
use crate::models::Label;
use crate::sanitize::{self, SanitizationLog, SanitizeConfig};
use crate::vectorstore::VectorIndex;
use providers::EmbeddingProvider;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_K: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Malicious,
    Safe,
    Unknown,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Malicious => "malicious",
            Status::Safe => "safe",
            Status::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evidence {
    pub text: String,
    pub label: Label,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub query_text: String,
    /// The normalized text that was actually embedded.
    pub cleaned_text: String,
    pub sanitization: SanitizationLog,
    pub status: Status,
    pub malicious_votes: usize,
    pub total_considered: usize,
    pub evidence: Vec<Evidence>,
}

/// Strict majority: exactly half is not enough.
pub fn verdict(malicious_votes: usize, total_considered: usize) -> Status {
    if total_considered == 0 {
        Status::Unknown
    } else if malicious_votes > total_considered / 2 {
        Status::Malicious
    } else {
        Status::Safe
    }
}

/// Read-only classification context built once at startup.
#[derive(Clone)]
pub struct Classifier {
    index: Arc<VectorIndex>,
    provider: Arc<dyn EmbeddingProvider>,
    k: usize,
    sanitizer: SanitizeConfig,
}

impl Classifier {
    pub fn new(index: Arc<VectorIndex>, provider: Arc<dyn EmbeddingProvider>, k: usize) -> Self {
        Self {
            index,
            provider,
            k,
            sanitizer: SanitizeConfig::default(),
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: SanitizeConfig) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Normalizes `message`, embeds it and votes over its nearest neighbors.
    ///
    /// Only an empty message (before or after normalization) is rejected;
    /// whitespace is classified like any other text.
    pub async fn classify(&self, message: &str) -> Result<ClassificationResult> {
        if message.is_empty() {
            return Err(Error::Input("message must not be empty".into()));
        }
        let cleaned = sanitize::sanitize(message, &self.sanitizer);
        if cleaned.text.is_empty() {
            return Err(Error::Input("message is empty after normalization".into()));
        }
        if cleaned.log.changed {
            debug!(log = ?cleaned.log, "normalized message");
        }

        let vector = self.provider.embed_one(&cleaned.text).await?;
        let neighbors = self.index.query(&vector, self.k)?;

        let malicious_votes = neighbors
            .iter()
            .filter(|n| n.document.label.is_malicious())
            .count();
        let total_considered = neighbors.len();
        let status = verdict(malicious_votes, total_considered);
        debug!(
            status = status.as_str(),
            malicious_votes, total_considered, "classified message"
        );

        Ok(ClassificationResult {
            query_text: message.to_string(),
            cleaned_text: cleaned.text,
            sanitization: cleaned.log,
            status,
            malicious_votes,
            total_considered,
            evidence: neighbors
                .into_iter()
                .map(|n| Evidence {
                    text: n.document.text.clone(),
                    label: n.document.label,
                    score: n.distance,
                })
                .collect(),
        })
    }
}
