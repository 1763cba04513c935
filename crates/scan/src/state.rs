//! Pure session state transitions.
//!
//! [`SessionState::apply`] computes the next state and the single action
//! the driver must take from `(current state, inbound message)`. It
//! performs no I/O, which keeps every transition of the protocol
//! unit-testable without a socket.

use kiosk_core::conditions::ConditionsStatus;
use kiosk_core::outcome::{AnalysisOutcome, OutcomeKind};
use kiosk_core::progress::{ProgressSignal, ScanProgress, ScanProgressTracker};

use crate::messages::{ServerMessage, VideoFeed};

/// Externally observable lifecycle phase of a scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SessionPhase {
    /// No session is live; waiting for a start command.
    Idle,
    /// Channel establishment is in flight.
    Connecting,
    /// Frames are flowing under credit control.
    Streaming,
    /// All passes done; credits stopped, awaiting the analysis result.
    AnalysisPending,
    /// Resolved with a recognition or detection outcome.
    Complete,
    /// Resolved with a failure outcome.
    Failed,
}

impl SessionPhase {
    /// Whether the session has resolved and the channel may be released.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Complete | SessionPhase::Failed)
    }
}

/// What the driver must do after a transition.
#[derive(Debug)]
pub enum Action {
    /// Nothing; keep waiting for the next event.
    None,
    /// Send a frame credit immediately.
    IssueCredit,
    /// Arm the pacing deadline for the next frame credit.
    ScheduleCredit,
    /// Stop issuing credits and wait for the analysis result.
    AwaitAnalysis,
    /// Terminal: publish the outcome and tear the channel down.
    Finish(AnalysisOutcome),
}

/// Mutable per-session state folded over channel events.
///
/// Created in `Connecting`; the `Idle` phase belongs to the controller,
/// which holds it whenever no session object exists.
#[derive(Debug)]
pub struct SessionState {
    phase: SessionPhase,
    conditions: ConditionsStatus,
    conditions_met: bool,
    tracker: ScanProgressTracker,
    outcome: Option<AnalysisOutcome>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Connecting,
            conditions: ConditionsStatus::default(),
            conditions_met: false,
            tracker: ScanProgressTracker::new(),
            outcome: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn conditions(&self) -> ConditionsStatus {
        self.conditions
    }

    /// The server's own evaluation of the acquisition gate.
    pub fn conditions_met(&self) -> bool {
        self.conditions_met
    }

    pub fn progress(&self) -> ScanProgress {
        self.tracker.progress()
    }

    pub fn outcome(&self) -> Option<&AnalysisOutcome> {
        self.outcome.as_ref()
    }

    /// Channel opened: start streaming and issue the first credit.
    pub fn on_open(&mut self) -> Action {
        self.phase = SessionPhase::Streaming;
        Action::IssueCredit
    }

    /// Fold one inbound message into the state.
    pub fn apply(&mut self, msg: ServerMessage) -> Action {
        match msg {
            ServerMessage::VideoFeed(frame) => self.apply_frame(frame),
            ServerMessage::AnalysisComplete(data) => self.finish(AnalysisOutcome::detections(
                data.predictions.predictions,
                data.data,
            )),
            ServerMessage::AnalysisError(data) => self.fail(data.message),
            ServerMessage::Unknown => Action::None,
        }
    }

    /// Transport loss or service-reported failure.
    pub fn fail(&mut self, reason: String) -> Action {
        self.finish(AnalysisOutcome::failed(reason))
    }

    fn apply_frame(&mut self, frame: VideoFeed) -> Action {
        if self.phase.is_terminal() {
            return Action::None;
        }

        self.conditions = frame.conditions_status;
        self.conditions_met = frame.conditions_met;

        if let Some(result) = frame.recognition_result {
            // A frame carrying a recognition result is terminal regardless
            // of the reported pass.
            return self.finish(AnalysisOutcome::recognized(result, frame.data));
        }

        match self.tracker.observe(frame.scan_pass, frame.scan_progress) {
            ProgressSignal::ScanComplete => {
                self.phase = SessionPhase::AnalysisPending;
                Action::AwaitAnalysis
            }
            ProgressSignal::Continue => {
                if self.phase == SessionPhase::AnalysisPending {
                    // Latched already; frames still in flight get no credit.
                    Action::None
                } else {
                    Action::ScheduleCredit
                }
            }
        }
    }

    /// Record the terminal outcome, exactly once per session.
    fn finish(&mut self, outcome: AnalysisOutcome) -> Action {
        if self.outcome.is_some() {
            // The service contract is one terminal shape per session.
            tracing::warn!(phase = ?self.phase, "Second terminal message after resolution; discarding");
            return Action::None;
        }

        self.phase = match outcome.kind {
            OutcomeKind::Failed { .. } => SessionPhase::Failed,
            _ => SessionPhase::Complete,
        };
        self.outcome = Some(outcome.clone());
        Action::Finish(outcome)
    }
}
