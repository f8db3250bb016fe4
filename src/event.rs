//! Moderation lifecycle events.
//!
//! The moderation pipeline publishes one message per decision. The payload
//! is discriminated by an `eventType` field; this enum deserializes it
//! directly, so dispatch is an exhaustive `match` rather than string
//! comparison at the call site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A moderation decision delivered by the event transport.
///
/// Handler failure must propagate to the transport so the message is
/// redelivered and eventually dead-lettered; see
/// [`IndexSynchronizer::handle`](crate::sync::IndexSynchronizer::handle).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum ModerationEvent {
    /// Video passed moderation and should be indexed.
    #[serde(rename = "VIDEO_APPROVED", rename_all = "camelCase")]
    Approved {
        video_id: Uuid,
        reviewer_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    /// Video failed moderation (or was retracted) and must leave the index.
    #[serde(rename = "VIDEO_REJECTED", rename_all = "camelCase")]
    Rejected {
        video_id: Uuid,
        reviewer_id: Uuid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl ModerationEvent {
    /// The subject video, for log and metric correlation.
    pub fn video_id(&self) -> Uuid {
        match self {
            ModerationEvent::Approved { video_id, .. } => *video_id,
            ModerationEvent::Rejected { video_id, .. } => *video_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_approved() {
        let json = r#"{
            "eventType": "VIDEO_APPROVED",
            "videoId": "a1b2c3d4-0000-0000-0000-000000000001",
            "reviewerId": "a1b2c3d4-0000-0000-0000-000000000002",
            "timestamp": "2026-03-01T12:00:00Z"
        }"#;

        let event: ModerationEvent = serde_json::from_str(json).unwrap();
        match event {
            ModerationEvent::Approved { video_id, .. } => {
                assert_eq!(
                    video_id.to_string(),
                    "a1b2c3d4-0000-0000-0000-000000000001"
                );
            }
            other => panic!("expected Approved, got {other:?}"),
        }
    }

    #[test]
    fn test_deserialize_rejected_with_reason() {
        let json = r#"{
            "eventType": "VIDEO_REJECTED",
            "videoId": "a1b2c3d4-0000-0000-0000-000000000001",
            "reviewerId": "a1b2c3d4-0000-0000-0000-000000000002",
            "reason": "copyright strike",
            "timestamp": "2026-03-01T12:00:00Z"
        }"#;

        let event: ModerationEvent = serde_json::from_str(json).unwrap();
        match event {
            ModerationEvent::Rejected { reason, .. } => {
                assert_eq!(reason.as_deref(), Some("copyright strike"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_rejected_reason_is_optional() {
        let json = r#"{
            "eventType": "VIDEO_REJECTED",
            "videoId": "a1b2c3d4-0000-0000-0000-000000000001",
            "reviewerId": "a1b2c3d4-0000-0000-0000-000000000002",
            "timestamp": "2026-03-01T12:00:00Z"
        }"#;

        let event: ModerationEvent = serde_json::from_str(json).unwrap();
        match event {
            ModerationEvent::Rejected { reason, .. } => assert!(reason.is_none()),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_event_type_fails() {
        let json = r#"{
            "eventType": "VIDEO_FLAGGED",
            "videoId": "a1b2c3d4-0000-0000-0000-000000000001",
            "reviewerId": "a1b2c3d4-0000-0000-0000-000000000002",
            "timestamp": "2026-03-01T12:00:00Z"
        }"#;

        assert!(serde_json::from_str::<ModerationEvent>(json).is_err());
    }

    #[test]
    fn test_video_id_accessor() {
        let id = Uuid::new_v4();
        let event = ModerationEvent::Approved {
            video_id: id,
            reviewer_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.video_id(), id);
    }

    #[test]
    fn test_serialize_emits_event_type_tag() {
        let event = ModerationEvent::Approved {
            video_id: Uuid::new_v4(),
            reviewer_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"eventType\":\"VIDEO_APPROVED\""));
        assert!(json.contains("\"videoId\""));
    }
}
