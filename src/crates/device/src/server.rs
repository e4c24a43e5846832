//! Screen API HTTP service.
//!
//! Serves the latest-frame cell over three endpoints: `/screen-info`
//! (blocks briefly for a fresh frame, 503 if none ever arrived),
//! `/health` (2xx once the stream is connected and a frame exists), and
//! `/streaming-status`.

use crate::screen::ScreenStream;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;

pub fn router(stream: Arc<ScreenStream>) -> Router {
    Router::new()
        .route("/screen-info", get(screen_info))
        .route("/health", get(health))
        .route("/streaming-status", get(streaming_status))
        .with_state(stream)
}

/// Bind and serve until the process exits.
pub async fn serve(stream: Arc<ScreenStream>, addr: std::net::SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "screen API listening");
    axum::serve(listener, router(stream)).await
}

async fn screen_info(State(stream): State<Arc<ScreenStream>>) -> Response {
    match stream.screen_data().await {
        Ok(data) => Json(data).into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

async fn health(State(stream): State<Arc<ScreenStream>>) -> Response {
    if stream.is_connected() && stream.has_frame() {
        (StatusCode::OK, "ok").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "no frame received").into_response()
    }
}

async fn streaming_status(State(stream): State<Arc<ScreenStream>>) -> Json<serde_json::Value> {
    Json(json!({"is_streaming_connected": stream.is_connected()}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::DeviceHardwareClient;
    use crate::screen::ScreenData;

    fn test_stream() -> Arc<ScreenStream> {
        let bridge = DeviceHardwareClient::new("http://localhost:1").unwrap();
        Arc::new(ScreenStream::spawn(bridge))
    }

    #[tokio::test]
    async fn test_streaming_status_payload() {
        let stream = test_stream();
        let Json(body) = streaming_status(State(stream)).await;
        assert_eq!(body["is_streaming_connected"], false);
    }

    #[tokio::test]
    async fn test_health_requires_frame() {
        let stream = test_stream();
        let response = health(State(stream.clone())).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        stream.push_frame(ScreenData {
            base64: String::new(),
            elements: Vec::new(),
            width: 1,
            height: 1,
            platform: "android".into(),
        });
        // Still not connected to the SSE stream, so health stays degraded.
        let response = health(State(stream)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
