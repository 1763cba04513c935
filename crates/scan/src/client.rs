//! WebSocket client for the capture/recognition service.
//!
//! [`ScanServiceClient`] holds the connection configuration for the
//! service. Call [`ScanServiceClient::connect`] with a session id to open
//! the per-session channel.

use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use kiosk_core::types::SessionId;

/// Configuration handle for the capture/recognition service.
pub struct ScanServiceClient {
    ws_url: String,
}

/// A live channel to the capture service for one scan session.
///
/// Owned exclusively by the session driver; never shared and never reused
/// across sessions.
pub struct ScanConnection {
    /// Freshness token embedded in the channel address.
    pub session_id: SessionId,
    /// The raw WebSocket stream for reading/writing frames.
    pub ws_stream: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

impl ScanServiceClient {
    /// Create a new client targeting the capture service.
    ///
    /// * `ws_url` - WebSocket base URL, e.g. `ws://127.0.0.1:8000`.
    pub fn new(ws_url: String) -> Self {
        Self { ws_url }
    }

    /// WebSocket base URL of the service.
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Open the per-session channel at `{base}/ws/{session_id}`.
    ///
    /// The session id carries no meaning for the service beyond keeping
    /// the channel address unique per attempt.
    pub async fn connect(&self, session_id: &str) -> Result<ScanConnection, ScanClientError> {
        let url = format!("{}/ws/{}", self.ws_url, session_id);

        let (ws_stream, _response) = connect_async(&url).await.map_err(|e| {
            ScanClientError::Connection(format!(
                "Failed to connect to capture service at {}: {e}",
                self.ws_url
            ))
        })?;

        tracing::info!(
            session_id = %session_id,
            "Connected to capture service at {}",
            self.ws_url,
        );

        Ok(ScanConnection {
            session_id: session_id.to_string(),
            ws_stream,
        })
    }
}

/// Errors that can occur when opening the session channel.
#[derive(Debug, thiserror::Error)]
pub enum ScanClientError {
    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),
}
