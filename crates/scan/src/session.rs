//! Session lifecycle: the state-machine driver and the controller handle.
//!
//! [`ScanController`] owns at most one live session at a time. `start`
//! tears down any previous session and spawns a driver task; `reset`
//! cancels the live session and returns the observable view to `Idle`.
//! Renderers observe [`SessionView`] snapshots through a
//! [`tokio::sync::watch`] channel and never touch controller state.
//!
//! The driver task owns the channel halves and the pacing deadline inside
//! one function scope, so every exit path (terminal message, transport
//! error, cancellation) releases both in the same step.

use std::sync::Arc;
use std::time::Duration;

use futures::{Sink, StreamExt};
use serde::Serialize;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use kiosk_core::conditions::{self, ConditionsStatus};
use kiosk_core::outcome::AnalysisOutcome;
use kiosk_core::progress::ScanProgress;
use kiosk_core::types::SessionId;

use crate::client::ScanServiceClient;
use crate::messages::{parse_message, ServerMessage};
use crate::pump::{credit_due, FramePump, PumpError};
use crate::state::{Action, SessionPhase, SessionState};

/// How long teardown waits for a cancelled session task to exit.
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Immutable snapshot published to renderers on every state change.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    /// Freshness token of the live session, if any.
    pub session_id: Option<SessionId>,
    pub phase: SessionPhase,
    /// Operator-facing status line derived from phase and conditions.
    pub status: String,
    pub conditions: ConditionsStatus,
    pub conditions_met: bool,
    pub progress: ScanProgress,
    /// Set exactly once, when the session resolves.
    pub outcome: Option<AnalysisOutcome>,
}

impl SessionView {
    /// The view held whenever no session is live.
    pub fn idle() -> Self {
        Self {
            session_id: None,
            phase: SessionPhase::Idle,
            status: "Idle".to_string(),
            conditions: ConditionsStatus::default(),
            conditions_met: false,
            progress: ScanProgress::default(),
            outcome: None,
        }
    }

    fn snapshot(session_id: &str, state: &SessionState) -> Self {
        Self {
            session_id: Some(session_id.to_string()),
            phase: state.phase(),
            status: status_for(state),
            conditions: state.conditions(),
            conditions_met: state.conditions_met(),
            progress: state.progress(),
            outcome: state.outcome().cloned(),
        }
    }
}

/// Derive the status line for the current phase.
fn status_for(state: &SessionState) -> String {
    match state.phase() {
        SessionPhase::Idle => "Idle".to_string(),
        SessionPhase::Connecting => "Connecting...".to_string(),
        SessionPhase::Streaming | SessionPhase::AnalysisPending => conditions::status_line(
            &state.conditions(),
            state.conditions_met(),
            state.phase() == SessionPhase::AnalysisPending,
            state.progress().percent,
        ),
        SessionPhase::Complete => "Scan complete".to_string(),
        SessionPhase::Failed => match state.outcome().and_then(AnalysisOutcome::failure_reason) {
            Some(reason) if !reason.is_empty() => reason.to_string(),
            _ => "Analysis Failed".to_string(),
        },
    }
}

/// Owns the single live (or idle) scan session.
///
/// Created once per kiosk surface; the renderer keeps the
/// [`watch::Receiver`] from [`subscribe`](Self::subscribe) and issues
/// `start` / `reset` commands. Dropping the controller cancels any live
/// session.
pub struct ScanController {
    client: Arc<ScanServiceClient>,
    interval: Duration,
    view_tx: watch::Sender<SessionView>,
    active: Option<ActiveSession>,
    /// Master cancellation token; cancelled on drop and shutdown.
    cancel: CancellationToken,
}

/// Bookkeeping for the live session task.
struct ActiveSession {
    /// Per-session token (child of the master token).
    cancel: CancellationToken,
    task_handle: tokio::task::JoinHandle<()>,
}

impl ScanController {
    pub fn new(client: ScanServiceClient, interval: Duration) -> Self {
        let (view_tx, _) = watch::channel(SessionView::idle());
        Self {
            client: Arc::new(client),
            interval,
            view_tx,
            active: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Observe session state. The receiver yields a fresh snapshot on
    /// every phase, condition, or progress change.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view_tx.subscribe()
    }

    /// The current snapshot.
    pub fn view(&self) -> SessionView {
        self.view_tx.borrow().clone()
    }

    /// Start a fresh scan session, tearing down any previous one first.
    ///
    /// Returns the new session id. The prior outcome, if any, is
    /// discarded.
    pub async fn start(&mut self) -> SessionId {
        self.teardown_active().await;

        let session_id: SessionId = uuid::Uuid::new_v4().to_string();
        let cancel = self.cancel.child_token();

        let client = Arc::clone(&self.client);
        let view_tx = self.view_tx.clone();
        let interval = self.interval;
        let id = session_id.clone();
        let task_cancel = cancel.clone();

        let task_handle = tokio::spawn(async move {
            run_session(&client, &id, interval, &view_tx, &task_cancel).await;
            tracing::debug!(session_id = %id, "Session task exited");
        });

        self.active = Some(ActiveSession {
            cancel,
            task_handle,
        });
        session_id
    }

    /// Discard the current session and outcome and return to `Idle`.
    pub async fn reset(&mut self) {
        self.teardown_active().await;
        self.view_tx.send_replace(SessionView::idle());
    }

    /// Cancel everything. Called on component teardown.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        self.teardown_active().await;
    }

    /// Cancel the live session task, if any, and wait for it to exit.
    async fn teardown_active(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            let _ = tokio::time::timeout(TEARDOWN_TIMEOUT, active.task_handle).await;
        }
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Drive one session from connect to terminal outcome.
///
/// Single event loop: reacts to the channel stream, the pacing deadline,
/// and the cancellation token. No retry or reconnect on transport loss.
async fn run_session(
    client: &ScanServiceClient,
    session_id: &str,
    interval: Duration,
    view_tx: &watch::Sender<SessionView>,
    cancel: &CancellationToken,
) {
    let mut state = SessionState::new();
    publish(view_tx, session_id, &state);

    let conn = tokio::select! {
        _ = cancel.cancelled() => {
            tracing::info!(session_id, "Session cancelled during connect");
            return;
        }
        result = client.connect(session_id) => match result {
            Ok(conn) => conn,
            Err(e) => {
                state.fail(format!("Connection failed: {e}"));
                publish(view_tx, session_id, &state);
                return;
            }
        },
    };

    let (sink, mut stream) = conn.ws_stream.split();
    let mut pump = FramePump::new(sink, interval);

    // Channel open: enter Streaming and issue the first frame credit.
    let action = state.on_open();
    publish(view_tx, session_id, &state);
    if let Err(e) = perform(action, &mut pump).await {
        state.fail(format!("Connection lost: {e}"));
        publish(view_tx, session_id, &state);
        return;
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(session_id, "Session cancelled");
                break;
            }
            _ = credit_due(pump.deadline()) => {
                pump.cancel();
                if let Err(e) = pump.request_next().await {
                    state.fail(format!("Connection lost: {e}"));
                    publish(view_tx, session_id, &state);
                    break;
                }
            }
            event = stream.next() => {
                if handle_channel_event(event, &mut state, &mut pump, view_tx, session_id).await {
                    break;
                }
            }
        }
    }

    // One exit point: the pacing deadline is dropped and the channel
    // closed in the same step, on every path out of the loop.
    pump.shutdown().await;
}

/// React to one channel event. Returns `true` when the loop must end.
async fn handle_channel_event<S>(
    event: Option<Result<Message, tungstenite::Error>>,
    state: &mut SessionState,
    pump: &mut FramePump<S>,
    view_tx: &watch::Sender<SessionView>,
    session_id: &str,
) -> bool
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    match event {
        Some(Ok(Message::Text(text))) => {
            let action = match parse_message(&text) {
                Ok(ServerMessage::Unknown) => {
                    tracing::debug!(session_id, "Ignoring unknown message type");
                    Action::None
                }
                Ok(msg) => state.apply(msg),
                Err(e) => {
                    // Protocol errors are absorbed locally; the session
                    // continues unaffected.
                    tracing::warn!(
                        session_id,
                        error = %e,
                        raw_message = %text,
                        "Failed to parse service message",
                    );
                    Action::None
                }
            };
            publish(view_tx, session_id, state);

            if let Err(e) = perform(action, pump).await {
                state.fail(format!("Connection lost: {e}"));
                publish(view_tx, session_id, state);
                return true;
            }
            state.phase().is_terminal()
        }
        Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
            // Handled automatically by tungstenite.
            false
        }
        Some(Ok(Message::Close(frame))) => {
            tracing::info!(session_id, ?frame, "Service closed the channel");
            fail_if_unresolved(state, view_tx, session_id, "Connection closed unexpectedly");
            true
        }
        Some(Ok(_)) => {
            // Binary / Frame — ignore.
            false
        }
        Some(Err(e)) => {
            tracing::error!(session_id, error = %e, "WebSocket receive error");
            fail_if_unresolved(state, view_tx, session_id, &format!("Connection lost: {e}"));
            true
        }
        None => {
            tracing::info!(session_id, "Channel stream exhausted");
            fail_if_unresolved(state, view_tx, session_id, "Connection closed unexpectedly");
            true
        }
    }
}

/// Execute the side effect a transition asked for.
async fn perform<S>(action: Action, pump: &mut FramePump<S>) -> Result<(), PumpError>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    match action {
        Action::None => Ok(()),
        Action::IssueCredit => pump.request_next().await,
        Action::ScheduleCredit => {
            pump.schedule_next();
            Ok(())
        }
        // The outcome is already recorded in the state; both terminal
        // actions just stop the credit flow here.
        Action::AwaitAnalysis | Action::Finish(_) => {
            pump.cancel();
            Ok(())
        }
    }
}

/// Surface a transport failure unless the session already resolved.
fn fail_if_unresolved(
    state: &mut SessionState,
    view_tx: &watch::Sender<SessionView>,
    session_id: &str,
    reason: &str,
) {
    if !state.phase().is_terminal() {
        state.fail(reason.to_string());
        publish(view_tx, session_id, state);
    }
}

/// Publish an immutable view snapshot to renderers.
fn publish(view_tx: &watch::Sender<SessionView>, session_id: &str, state: &SessionState) {
    view_tx.send_replace(SessionView::snapshot(session_id, state));
}
