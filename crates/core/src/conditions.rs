//! Acquisition-condition gate and operator status line.
//!
//! The capture service reports three per-frame quality booleans. All three
//! must hold simultaneously before scan progress may advance; this is a
//! gate, not a scored average. The status line names the first failing
//! condition in a fixed order (pose, distance, lighting) so the operator is
//! never asked to fix two things at once.

use serde::{Deserialize, Serialize};

/// Per-frame acquisition quality booleans reported by the capture service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionsStatus {
    pub face_straight: bool,
    pub distance_ok: bool,
    pub lighting_ok: bool,
}

impl ConditionsStatus {
    /// The gate: every condition must hold at the same time.
    pub fn met(&self) -> bool {
        self.face_straight && self.distance_ok && self.lighting_ok
    }
}

/// Derive the single operator-facing status line.
///
/// Priority is fixed: a pending analysis overrides everything, then the
/// first unmet condition in order (pose, distance, lighting), then the scan
/// progress once the server-evaluated gate is met, then a generic
/// hold-still prompt.
///
/// `conditions_met` is the server's own evaluation of the gate and is
/// reported separately from the booleans; the progress line trusts it
/// rather than re-deriving locally.
pub fn status_line(
    conditions: &ConditionsStatus,
    conditions_met: bool,
    analysis_pending: bool,
    percent: f64,
) -> String {
    if analysis_pending {
        return "Analyzing face...".to_string();
    }
    if !conditions.face_straight {
        return "Please face straight ahead".to_string();
    }
    if !conditions.distance_ok {
        return "Please adjust your distance".to_string();
    }
    if !conditions.lighting_ok {
        return "Please improve lighting".to_string();
    }
    if conditions_met {
        return format!("Scanning in progress: {}%", percent.round() as i64);
    }
    "Please maintain position".to_string()
}
