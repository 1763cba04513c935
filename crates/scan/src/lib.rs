//! Scan-session protocol controller for the attendance kiosk.
//!
//! Owns the realtime channel to the remote capture/recognition service,
//! paces frame delivery with credit-based flow control, tracks multi-pass
//! scan progress and acquisition conditions, and resolves each session to a
//! terminal outcome. Rendering and operator input live elsewhere: they
//! observe [`session::SessionView`] snapshots and issue the two commands on
//! [`session::ScanController`] (`start`, `reset`).

pub mod client;
pub mod messages;
pub mod pump;
pub mod session;
pub mod state;
