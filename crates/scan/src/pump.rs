//! Credit-based frame flow control.
//!
//! The capture service must never push unsolicited frames: the client
//! sends one credit token per frame it is ready to render, paced by a
//! fixed delay between frames. At most one credit is outstanding at any
//! time, which caps the frame cadence at roughly 50 requests per second
//! with the default interval.

use std::time::Duration;

use futures::{Sink, SinkExt};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;

use crate::messages::FRAME_CREDIT;

/// Default delay between receiving a frame and requesting the next one.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(20);

/// Issues frame credits over the send half of the session channel.
///
/// The pump owns the sink exclusively. The pacing deadline is a plain
/// value polled by the session driver's event loop via [`credit_due`], so
/// no timer ever outlives the session scope.
#[derive(Debug)]
pub struct FramePump<S> {
    sink: S,
    interval: Duration,
    deadline: Option<Instant>,
    open: bool,
}

/// Failure to push a credit onto the channel.
#[derive(Debug, thiserror::Error)]
pub enum PumpError {
    #[error("Failed to send frame credit: {0}")]
    Send(String),
}

impl<S> FramePump<S>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    pub fn new(sink: S, interval: Duration) -> Self {
        Self {
            sink,
            interval,
            deadline: None,
            open: true,
        }
    }

    /// Send one credit token now, iff the channel is still open.
    ///
    /// A no-op after [`shutdown`](Self::shutdown), which covers the race where a
    /// teardown is already in flight. A send failure marks the channel
    /// closed and is reported so the driver can fail the session.
    pub async fn request_next(&mut self) -> Result<(), PumpError> {
        if !self.open {
            return Ok(());
        }
        self.sink
            .send(Message::Text(FRAME_CREDIT.into()))
            .await
            .map_err(|e| {
                self.open = false;
                PumpError::Send(e.to_string())
            })
    }

    /// Arm the one-shot pacing deadline. Re-arming replaces the deadline.
    pub fn schedule_next(&mut self) {
        self.deadline = Some(Instant::now() + self.interval);
    }

    /// Disarm the pacing deadline. Idempotent.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Whether a credit is currently scheduled.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// The armed deadline, for polling with [`credit_due`].
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Send a Close frame and mark the channel closed.
    ///
    /// Errors are ignored; dropping the stream halves tears the transport
    /// down regardless.
    pub async fn shutdown(&mut self) {
        self.deadline = None;
        if self.open {
            self.open = false;
            let _ = self.sink.close().await;
        }
    }
}

/// Resolve once the pacing deadline elapses; pend forever when unarmed.
///
/// Takes the deadline by value so the pump itself stays free for the
/// driver to mutate in whichever `select!` branch wins.
pub async fn credit_due(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
