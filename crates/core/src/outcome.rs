//! Terminal outcome types and the completion-shape resolver.
//!
//! The capture service signals completion in two distinct shapes: a
//! `recognition_result` embedded in an ordinary video frame, or a separate
//! detection-analysis message with a nested predictions list. Both
//! normalize to a single [`AnalysisOutcome`], produced at most once per
//! session; the session driver performs the teardown.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Inline recognition payload attached to the terminal frame of a session.
///
/// Expected shapes: a success (`class` set, `error` absent) or a failure
/// (`error` set). Anything else is malformed but tolerated; see
/// [`RecognitionResult::normalized`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    /// Identified roster entry on a successful match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Match confidence in [0,1]; may accompany either shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Failure reason on an unsuccessful identification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecognitionResult {
    /// Whether this payload is the expected success shape.
    pub fn is_success(&self) -> bool {
        self.class.is_some() && self.error.is_none()
    }

    /// Collapse malformed shapes into an explicit failure.
    ///
    /// `class` and `error` both present, or both absent, is tolerated and
    /// becomes a failure with an empty reason. Well-formed payloads pass
    /// through unchanged.
    pub fn normalized(self) -> Self {
        match (&self.class, &self.error) {
            (Some(_), None) | (None, Some(_)) => self,
            _ => Self {
                class: None,
                confidence: self.confidence,
                error: Some(String::new()),
            },
        }
    }
}

/// One detected object from the multi-object completion path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub confidence: f64,
    #[serde(rename = "class")]
    pub class_label: String,
    pub class_id: i64,
}

/// The single terminal value a session resolves to. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    pub kind: OutcomeKind,
    /// When the session resolved, UTC.
    pub resolved_at: Timestamp,
}

/// The three completion shapes, normalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum OutcomeKind {
    /// The service identified (or explicitly failed to identify) one face.
    Recognized {
        result: RecognitionResult,
        /// Base64 JPEG of the analyzed frame, for the renderer.
        image: String,
    },
    /// The service returned multi-object detections instead.
    Detections {
        predictions: Vec<Detection>,
        image: String,
    },
    /// The session itself failed: transport loss or a service-reported
    /// analysis error.
    Failed { reason: String },
}

impl AnalysisOutcome {
    /// Resolve an inline recognition payload from a terminal frame.
    pub fn recognized(result: RecognitionResult, image: String) -> Self {
        Self {
            kind: OutcomeKind::Recognized {
                result: result.normalized(),
                image,
            },
            resolved_at: chrono::Utc::now(),
        }
    }

    /// Resolve a standalone detection-analysis message.
    pub fn detections(predictions: Vec<Detection>, image: String) -> Self {
        Self {
            kind: OutcomeKind::Detections { predictions, image },
            resolved_at: chrono::Utc::now(),
        }
    }

    /// Resolve a session failure. The reason is preserved verbatim.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::Failed {
                reason: reason.into(),
            },
            resolved_at: chrono::Utc::now(),
        }
    }

    /// The failure reason, if this outcome is a failure.
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.kind {
            OutcomeKind::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}
