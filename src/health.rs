// src/health.rs
//
// Liveness endpoint. A single GET at the root returns 200 with a fixed
// message; it says nothing about watcher health, which is intentional —
// the two are independent concerns.

use anyhow::{Context, Result};
use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::info;

pub fn router(message: String) -> Router {
    Router::new().route("/", get(root)).with_state(message)
}

async fn root(State(message): State<String>) -> Json<Value> {
    Json(json!({ "message": message }))
}

pub async fn serve(
    bind: String,
    message: String,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind health endpoint on {bind}"))?;
    info!("health endpoint listening on http://{bind}");
    axum::serve(listener, router(message))
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await
        .context("health endpoint server error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_root_returns_message_json() {
        let app = router("violation watcher running".to_string());
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["message"], "violation watcher running");
    }
}
