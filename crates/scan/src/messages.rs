//! Wire messages exchanged with the capture/recognition service.
//!
//! The service sends JSON text frames tagged by a top-level `type` field,
//! with the payload fields as siblings of the tag. This module deserializes
//! them into a closed [`ServerMessage`] enum so that dispatch is exhaustive
//! at compile time. The client sends a single credit token per frame it is
//! ready to receive.

use serde::Deserialize;

use kiosk_core::conditions::ConditionsStatus;
use kiosk_core::outcome::{Detection, RecognitionResult};

/// Credit token authorizing the service to send exactly one more frame.
pub const FRAME_CREDIT: &str = "next";

/// All known service message types.
///
/// Unrecognized `type` values fall through to [`ServerMessage::Unknown`]
/// so that new server message kinds are a no-op rather than a parse error.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// One streamed frame; terminal when `recognition_result` is present.
    #[serde(rename = "video_feed")]
    VideoFeed(VideoFeed),

    /// Terminal multi-object detection outcome.
    #[serde(rename = "analysis_complete")]
    AnalysisComplete(AnalysisComplete),

    /// Terminal failure reported by the service.
    #[serde(rename = "analysis_error")]
    AnalysisError(AnalysisError),

    /// Forward-compatible catch-all; ignored by the session state machine.
    #[serde(other)]
    Unknown,
}

/// Payload of a `video_feed` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoFeed {
    /// Base64-encoded JPEG of the annotated camera frame.
    pub data: String,
    pub conditions_status: ConditionsStatus,
    /// Server-evaluated conjunction of the condition booleans.
    pub conditions_met: bool,
    /// Percent complete within the current pass (0-100).
    pub scan_progress: f64,
    /// Current pass number; values above the pass count signal end of scan.
    pub scan_pass: u32,
    /// Present only on the terminal frame of a recognized session.
    #[serde(default)]
    pub recognition_result: Option<RecognitionResult>,
}

/// Payload of an `analysis_complete` message.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisComplete {
    /// Base64-encoded JPEG of the analyzed frame.
    pub data: String,
    pub predictions: PredictionsEnvelope,
}

/// The service nests the detection list one level deep.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictionsEnvelope {
    #[serde(default)]
    pub predictions: Vec<Detection>,
}

/// Payload of an `analysis_error` message.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisError {
    pub message: String,
}

/// Parse a service text frame into a typed message.
///
/// Returns `Err` for malformed JSON or for known types with missing
/// fields; unknown `type` values parse as [`ServerMessage::Unknown`].
/// Callers log and drop either way.
pub fn parse_message(text: &str) -> Result<ServerMessage, serde_json::Error> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_video_feed_frame() {
        let json = r#"{
            "type": "video_feed",
            "data": "ZmFrZQ==",
            "conditions_status": {"face_straight": true, "distance_ok": true, "lighting_ok": false},
            "conditions_met": false,
            "scan_progress": 42.5,
            "scan_pass": 1
        }"#;
        let msg = parse_message(json).unwrap();
        match msg {
            ServerMessage::VideoFeed(frame) => {
                assert_eq!(frame.data, "ZmFrZQ==");
                assert!(frame.conditions_status.face_straight);
                assert!(!frame.conditions_status.lighting_ok);
                assert!(!frame.conditions_met);
                assert_eq!(frame.scan_progress, 42.5);
                assert_eq!(frame.scan_pass, 1);
                assert!(frame.recognition_result.is_none());
            }
            other => panic!("Expected VideoFeed, got {other:?}"),
        }
    }

    #[test]
    fn parse_video_feed_with_recognition_result() {
        let json = r#"{
            "type": "video_feed",
            "data": "ZmFrZQ==",
            "conditions_status": {"face_straight": true, "distance_ok": true, "lighting_ok": true},
            "conditions_met": true,
            "scan_progress": 100.0,
            "scan_pass": 2,
            "recognition_result": {"class": "alice", "confidence": 0.93}
        }"#;
        let msg = parse_message(json).unwrap();
        match msg {
            ServerMessage::VideoFeed(frame) => {
                let result = frame.recognition_result.expect("result should be present");
                assert_eq!(result.class.as_deref(), Some("alice"));
                assert_eq!(result.confidence, Some(0.93));
                assert!(result.error.is_none());
            }
            other => panic!("Expected VideoFeed, got {other:?}"),
        }
    }

    #[test]
    fn parse_recognition_error_shape() {
        let json = r#"{
            "type": "video_feed",
            "data": "ZmFrZQ==",
            "conditions_status": {"face_straight": true, "distance_ok": true, "lighting_ok": true},
            "conditions_met": true,
            "scan_progress": 100.0,
            "scan_pass": 2,
            "recognition_result": {"error": "No confident match", "confidence": 0.41}
        }"#;
        let msg = parse_message(json).unwrap();
        match msg {
            ServerMessage::VideoFeed(frame) => {
                let result = frame.recognition_result.expect("result should be present");
                assert!(result.class.is_none());
                assert_eq!(result.error.as_deref(), Some("No confident match"));
            }
            other => panic!("Expected VideoFeed, got {other:?}"),
        }
    }

    #[test]
    fn parse_analysis_complete_with_predictions() {
        let json = r#"{
            "type": "analysis_complete",
            "data": "ZmFrZQ==",
            "predictions": {"predictions": [
                {"x": 10.0, "y": 20.0, "width": 64.0, "height": 64.0,
                 "confidence": 0.88, "class": "face", "class_id": 0}
            ]}
        }"#;
        let msg = parse_message(json).unwrap();
        match msg {
            ServerMessage::AnalysisComplete(data) => {
                assert_eq!(data.data, "ZmFrZQ==");
                assert_eq!(data.predictions.predictions.len(), 1);
                let detection = &data.predictions.predictions[0];
                assert_eq!(detection.class_label, "face");
                assert_eq!(detection.class_id, 0);
                assert_eq!(detection.confidence, 0.88);
            }
            other => panic!("Expected AnalysisComplete, got {other:?}"),
        }
    }

    #[test]
    fn parse_analysis_complete_without_prediction_list() {
        let json = r#"{"type": "analysis_complete", "data": "ZmFrZQ==", "predictions": {}}"#;
        let msg = parse_message(json).unwrap();
        match msg {
            ServerMessage::AnalysisComplete(data) => {
                assert!(data.predictions.predictions.is_empty());
            }
            other => panic!("Expected AnalysisComplete, got {other:?}"),
        }
    }

    #[test]
    fn parse_analysis_error() {
        let json = r#"{"type": "analysis_error", "message": "No face detected in frame"}"#;
        let msg = parse_message(json).unwrap();
        match msg {
            ServerMessage::AnalysisError(data) => {
                assert_eq!(data.message, "No face detected in frame");
            }
            other => panic!("Expected AnalysisError, got {other:?}"),
        }
    }

    #[test]
    fn parse_unknown_type_is_tolerated() {
        let json = r#"{"type": "heartbeat", "uptime": 12}"#;
        let msg = parse_message(json).unwrap();
        assert!(matches!(msg, ServerMessage::Unknown));
    }

    #[test]
    fn parse_invalid_json_returns_error() {
        assert!(parse_message("not json at all").is_err());
    }

    #[test]
    fn parse_known_type_with_missing_fields_returns_error() {
        let json = r#"{"type": "video_feed", "data": "ZmFrZQ=="}"#;
        assert!(parse_message(json).is_err());
    }
}
