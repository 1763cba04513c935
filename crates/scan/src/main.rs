//! `kiosk-scan` -- headless scan-session runner.
//!
//! Connects to the capture/recognition service, drives one scan session to
//! its terminal outcome, and logs every state change. Useful for
//! smoke-testing a capture pipeline without the kiosk front end.
//!
//! # Environment variables
//!
//! | Variable            | Required | Default | Description                                  |
//! |---------------------|----------|---------|----------------------------------------------|
//! | `SCAN_WS_URL`       | yes      | --      | Service base URL, e.g. `ws://127.0.0.1:8000` |
//! | `FRAME_INTERVAL_MS` | no       | `20`    | Pacing delay between frame credits           |

use std::time::Duration;

use kiosk_scan::client::ScanServiceClient;
use kiosk_scan::pump::DEFAULT_FRAME_INTERVAL;
use kiosk_scan::session::ScanController;

use kiosk_core::outcome::OutcomeKind;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kiosk_scan=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let ws_url = std::env::var("SCAN_WS_URL").unwrap_or_else(|_| {
        tracing::error!("SCAN_WS_URL environment variable is required");
        std::process::exit(1);
    });

    let interval_ms: u64 = std::env::var("FRAME_INTERVAL_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_FRAME_INTERVAL.as_millis() as u64);

    tracing::info!(ws_url = %ws_url, interval_ms, "Starting kiosk-scan");

    let mut controller = ScanController::new(
        ScanServiceClient::new(ws_url),
        Duration::from_millis(interval_ms),
    );
    let mut view_rx = controller.subscribe();

    let session_id = controller.start().await;
    tracing::info!(session_id = %session_id, "Scan session started");

    while view_rx.changed().await.is_ok() {
        let view = view_rx.borrow_and_update().clone();
        tracing::info!(phase = ?view.phase, status = %view.status, "Session state");

        if let Some(outcome) = view.outcome {
            match outcome.kind {
                OutcomeKind::Recognized { result, .. } => {
                    if result.is_success() {
                        tracing::info!(
                            class = result.class.as_deref().unwrap_or_default(),
                            confidence = result.confidence,
                            "Face recognized",
                        );
                    } else {
                        tracing::warn!(
                            reason = result.error.as_deref().unwrap_or_default(),
                            "Recognition failed",
                        );
                    }
                }
                OutcomeKind::Detections { predictions, .. } => {
                    tracing::info!(count = predictions.len(), "Detection analysis complete");
                }
                OutcomeKind::Failed { reason } => {
                    tracing::error!(reason = %reason, "Session failed");
                }
            }
            break;
        }
    }

    controller.shutdown().await;
}
