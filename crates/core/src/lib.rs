//! Core library: labeled vector index, nearest-neighbor voting, dataset ingestion.

pub mod classifier;
pub mod config;
pub mod dataset;
pub mod embeddings;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod sanitize;
pub mod vectorstore;

pub use classifier::{ClassificationResult, Classifier, Status};
pub use error::{Error, Result};
pub use vectorstore::{DistanceMetric, VectorIndex};
