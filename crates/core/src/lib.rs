//! Pure domain logic for the face-scan attendance kiosk.
//!
//! Acquisition-condition gating, multi-pass scan progress tracking, and
//! terminal outcome resolution. No I/O lives here; the WebSocket protocol
//! and session driver are in `kiosk-scan`.

pub mod conditions;
pub mod outcome;
pub mod progress;
pub mod types;
