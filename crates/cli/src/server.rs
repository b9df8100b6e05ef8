//! HTTP surface: `POST /check` and `GET /healthz`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use knn_guard_core::classifier::{Classifier, Status};
use knn_guard_core::sanitize::SanitizationLog;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

pub const MISSING_MESSAGE: &str = "Missing 'message' in request";

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SimilarExample {
    pub text: String,
    pub label: i64,
    pub score: f32,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub message: String,
    pub cleaned_text: String,
    pub sanitization_log: SanitizationLog,
    pub status: Status,
    pub malicious_votes: usize,
    pub total_considered: usize,
    pub similar_examples: Vec<SimilarExample>,
}

pub type Reply = (StatusCode, Json<Value>);

pub fn router(classifier: Classifier) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/check", post(check))
        .layer(CorsLayer::permissive())
        .with_state(classifier)
}

pub async fn serve(classifier: Classifier, bind: &str) -> anyhow::Result<()> {
    use anyhow::Context;

    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address {bind}"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Starting server on http://{addr}");
    axum::serve(listener, router(classifier))
        .await
        .context("server shutdown")?;
    Ok(())
}

pub async fn healthz(State(classifier): State<Classifier>) -> Reply {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "documents": classifier.index().len(),
            "metric": classifier.index().metric().to_string(),
        })),
    )
}

pub async fn check(
    State(classifier): State<Classifier>,
    body: Result<Json<CheckRequest>, JsonRejection>,
) -> Reply {
    let message = match body {
        Ok(Json(CheckRequest {
            message: Some(message),
        })) => message,
        _ => return error_reply(StatusCode::BAD_REQUEST, MISSING_MESSAGE),
    };

    match classifier.classify(&message).await {
        Ok(result) if result.status == Status::Unknown => (
            StatusCode::OK,
            Json(json!({ "status": "unknown", "reason": "No similar examples found" })),
        ),
        Ok(result) => {
            let resp = CheckResponse {
                message: result.query_text,
                cleaned_text: result.cleaned_text,
                sanitization_log: result.sanitization,
                status: result.status,
                malicious_votes: result.malicious_votes,
                total_considered: result.total_considered,
                similar_examples: result
                    .evidence
                    .into_iter()
                    .map(|e| SimilarExample {
                        text: e.text,
                        label: e.label.into(),
                        score: e.score,
                    })
                    .collect(),
            };
            match serde_json::to_value(resp) {
                Ok(v) => (StatusCode::OK, Json(v)),
                Err(e) => error_reply(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
            }
        }
        Err(err) if err.is_client_error() => {
            info!(error = %err, "rejected request");
            error_reply(StatusCode::BAD_REQUEST, MISSING_MESSAGE)
        }
        Err(err) => {
            error!(error = %err, "classification failed");
            error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Vector search failed: {err}"),
            )
        }
    }
}

fn error_reply(status: StatusCode, message: &str) -> Reply {
    (status, Json(json!({ "error": message })))
}
