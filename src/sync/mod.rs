// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Index synchronization pipeline.
//!
//! Translates moderation decisions into index mutations:
//!
//! ```text
//! ModerationEvent
//!       │
//!       ├─→ Approved ─→ fetch detail ──→ not found?  warn + ack (no write)
//!       │                  │
//!       │                  ├─→ retryable failure → propagate (redeliver/DLQ)
//!       │                  │
//!       │                  └─→ detail.status != APPROVED? skip
//!       │                           │
//!       │                           └─→ map → atomic upsert
//!       │
//!       └─→ Rejected ─→ delete-if-present (idempotent)
//! ```
//!
//! Both paths are idempotent under redelivery: re-running an event against
//! the same upstream state produces the same end state, which is the whole
//! correctness story under concurrent redelivery (no mutual exclusion
//! here). Persistence failures always propagate; the synchronizer never
//! converts a retryable failure into a silent skip, and never converts
//! not-found into a retry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::event::ModerationEvent;
use crate::fetcher::{FetchError, VideoDetail, VideoFetcher};
use crate::metrics;
use crate::record::{Coordinates, IndexRecord, PrimaryLocation};
use crate::storage::{IndexStore, StorageError};

/// Upstream status a detail must carry for indexing to proceed.
const STATUS_APPROVED: &str = "APPROVED";

/// Failure modes of handling one moderation event.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IndexError {
    /// Whether the event transport should redeliver.
    pub fn is_retryable(&self) -> bool {
        match self {
            IndexError::Fetch(err) => err.is_retryable(),
            // A failed write may succeed on redelivery; nothing was
            // half-written (single-statement mutations).
            IndexError::Storage(_) => true,
        }
    }
}

/// Consumes moderation decisions and mutates the index accordingly.
pub struct IndexSynchronizer {
    fetcher: Arc<dyn VideoFetcher>,
    store: Arc<dyn IndexStore>,
}

impl IndexSynchronizer {
    pub fn new(fetcher: Arc<dyn VideoFetcher>, store: Arc<dyn IndexStore>) -> Self {
        Self { fetcher, store }
    }

    /// Handle one event. An `Err` must propagate to the transport so the
    /// message is redelivered and eventually dead-lettered.
    pub async fn handle(&self, event: &ModerationEvent) -> Result<(), IndexError> {
        match event {
            ModerationEvent::Approved { video_id, .. } => self.index_video(*video_id).await,
            ModerationEvent::Rejected { video_id, .. } => self.remove_video(*video_id).await,
        }
    }

    /// Index an approved video: fetch its authoritative detail and upsert
    /// the denormalized record.
    pub async fn index_video(&self, video_id: Uuid) -> Result<(), IndexError> {
        info!(video_id = %video_id, "Indexing video");

        let detail = match self.fetcher.fetch(video_id).await {
            Ok(detail) => detail,
            Err(FetchError::NotFound { .. }) => {
                // Expected when a video is deleted between approval and
                // indexing. Ack without writing; retrying cannot help.
                warn!(video_id = %video_id, "Video not found upstream, skipping indexing");
                metrics::record_index_operation("index", "skipped_not_found");
                return Ok(());
            }
            Err(err) => {
                metrics::record_fetch_error(err.kind());
                return Err(err.into());
            }
        };

        if detail.status != STATUS_APPROVED {
            // The event raced a later moderation decision; the rejection
            // event will handle removal.
            warn!(
                video_id = %video_id,
                status = %detail.status,
                "Video is not approved, skipping indexing"
            );
            metrics::record_index_operation("index", "skipped_status");
            return Ok(());
        }

        let record = map_detail(detail, Utc::now());
        self.store.upsert(&record).await?;

        metrics::record_index_operation("index", "success");
        info!(video_id = %video_id, "Successfully indexed video");
        Ok(())
    }

    /// Remove a rejected video from the index. Absence is a no-op.
    pub async fn remove_video(&self, video_id: Uuid) -> Result<(), IndexError> {
        if self.store.delete(video_id).await? {
            metrics::record_index_operation("remove", "success");
            info!(video_id = %video_id, "Removed video from index");
        } else {
            metrics::record_index_operation("remove", "noop");
            debug!(video_id = %video_id, "Video not in index, nothing to remove");
        }
        Ok(())
    }
}

/// Deterministic detail → record mapping.
///
/// Missing optional scalars stay absent; missing tag lists become empty
/// sets, never absent. The primary location is the first entry flagged
/// primary; when that entry carries no location data there is no fallback
/// to a later one. Coordinates are copied only when upstream provided both
/// values (the wire object is atomic).
pub(crate) fn map_detail(detail: VideoDetail, indexed_at: DateTime<Utc>) -> IndexRecord {
    let primary_location = detail
        .locations
        .unwrap_or_default()
        .into_iter()
        .find(|entry| entry.is_primary)
        .and_then(|entry| entry.location)
        .map(|summary| PrimaryLocation {
            id: summary.id,
            display_name: summary.display_name,
            city: summary.city,
            state: summary.state,
            coordinates: summary.coordinates.map(|c| Coordinates {
                latitude: c.latitude,
                longitude: c.longitude,
            }),
        });

    IndexRecord {
        id: detail.id,
        external_id: detail.external_id,
        title: detail.title,
        description: detail.description,
        thumbnail_url: detail.thumbnail_url,
        duration_seconds: detail.duration_seconds,
        channel_id: detail.channel_id,
        channel_name: detail.channel_name,
        video_date: detail.video_date,
        amendments: detail.amendments.unwrap_or_default().into_iter().collect(),
        participants: detail
            .participants
            .unwrap_or_default()
            .into_iter()
            .collect(),
        primary_location,
        indexed_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{LocationSummary, VideoLocation};
    use crate::storage::InMemoryIndexStore;
    use async_trait::async_trait;

    struct StubFetcher {
        response: Box<dyn Fn(Uuid) -> Result<VideoDetail, FetchError> + Send + Sync>,
    }

    #[async_trait]
    impl VideoFetcher for StubFetcher {
        async fn fetch(&self, video_id: Uuid) -> Result<VideoDetail, FetchError> {
            (self.response)(video_id)
        }
    }

    fn detail(id: Uuid, status: &str) -> VideoDetail {
        VideoDetail {
            id,
            external_id: "ext123".to_string(),
            title: "A video".to_string(),
            description: Some("about things".to_string()),
            thumbnail_url: None,
            duration_seconds: Some(90),
            channel_id: None,
            channel_name: None,
            video_date: None,
            amendments: None,
            participants: None,
            status: status.to_string(),
            created_at: None,
            locations: None,
        }
    }

    fn synchronizer(
        response: impl Fn(Uuid) -> Result<VideoDetail, FetchError> + Send + Sync + 'static,
    ) -> (IndexSynchronizer, Arc<InMemoryIndexStore>) {
        let store = Arc::new(InMemoryIndexStore::new());
        let sync = IndexSynchronizer::new(
            Arc::new(StubFetcher {
                response: Box::new(response),
            }),
            store.clone(),
        );
        (sync, store)
    }

    #[tokio::test]
    async fn test_approved_video_is_indexed() {
        let (sync, store) = synchronizer(|id| Ok(detail(id, "APPROVED")));
        let video_id = Uuid::new_v4();

        sync.index_video(video_id).await.unwrap();

        let record = store.get(video_id).await.unwrap().unwrap();
        assert_eq!(record.external_id, "ext123");
        // Omitted upstream lists become empty sets, never absent
        assert!(record.amendments.is_empty());
        assert!(record.participants.is_empty());
    }

    #[tokio::test]
    async fn test_reindex_is_idempotent() {
        let (sync, store) = synchronizer(|id| Ok(detail(id, "APPROVED")));
        let video_id = Uuid::new_v4();

        sync.index_video(video_id).await.unwrap();
        sync.index_video(video_id).await.unwrap();

        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_not_found_skips_without_error() {
        let (sync, store) = synchronizer(|id| Err(FetchError::NotFound { video_id: id }));

        sync.index_video(Uuid::new_v4()).await.unwrap();

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_retryable_failure_propagates_without_writing() {
        let (sync, store) = synchronizer(|id| {
            Err(FetchError::Unavailable {
                video_id: id,
                status: 503,
            })
        });

        let err = sync.index_video(Uuid::new_v4()).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_terminal_upstream_failure_propagates_as_non_retryable() {
        let (sync, _store) = synchronizer(|id| {
            Err(FetchError::Upstream {
                video_id: id,
                status: 403,
            })
        });

        let err = sync.index_video(Uuid::new_v4()).await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_non_approved_status_skips_write() {
        let (sync, store) = synchronizer(|id| Ok(detail(id, "REJECTED")));

        sync.index_video(Uuid::new_v4()).await.unwrap();

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (sync, store) = synchronizer(|id| Ok(detail(id, "APPROVED")));
        let video_id = Uuid::new_v4();

        sync.index_video(video_id).await.unwrap();
        sync.remove_video(video_id).await.unwrap();
        // Redelivery of the same rejection: still fine
        sync.remove_video(video_id).await.unwrap();

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_handle_dispatches_by_event_type() {
        let (sync, store) = synchronizer(|id| Ok(detail(id, "APPROVED")));
        let video_id = Uuid::new_v4();

        sync.handle(&ModerationEvent::Approved {
            video_id,
            reviewer_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        })
        .await
        .unwrap();
        assert!(store.exists(video_id).await.unwrap());

        sync.handle(&ModerationEvent::Rejected {
            video_id,
            reviewer_id: Uuid::new_v4(),
            reason: Some("retracted".to_string()),
            timestamp: Utc::now(),
        })
        .await
        .unwrap();
        assert!(!store.exists(video_id).await.unwrap());
    }

    #[test]
    fn test_map_detail_fills_tag_sets() {
        let mut d = detail(Uuid::new_v4(), "APPROVED");
        d.amendments = Some(vec!["FIRST".to_string(), "FIRST".to_string()]);

        let record = map_detail(d, Utc::now());

        // Duplicates collapse; missing participants become the empty set
        assert_eq!(record.amendments.len(), 1);
        assert!(record.participants.is_empty());
    }

    #[test]
    fn test_map_detail_selects_first_primary_location() {
        let primary_summary_id = Uuid::new_v4();
        let mut d = detail(Uuid::new_v4(), "APPROVED");
        d.locations = Some(vec![
            VideoLocation {
                id: Uuid::new_v4(),
                location_id: Uuid::new_v4(),
                is_primary: false,
                location: Some(LocationSummary {
                    id: Uuid::new_v4(),
                    display_name: Some("Not primary".to_string()),
                    city: None,
                    state: None,
                    coordinates: None,
                }),
            },
            VideoLocation {
                id: Uuid::new_v4(),
                location_id: Uuid::new_v4(),
                is_primary: true,
                location: Some(LocationSummary {
                    id: primary_summary_id,
                    display_name: Some("City Hall".to_string()),
                    city: Some("San Francisco".to_string()),
                    state: Some("CA".to_string()),
                    coordinates: Some(crate::fetcher::Coordinates {
                        latitude: 37.77,
                        longitude: -122.42,
                    }),
                }),
            },
        ]);

        let record = map_detail(d, Utc::now());

        let location = record.primary_location.unwrap();
        assert_eq!(location.id, primary_summary_id);
        assert_eq!(location.state.as_deref(), Some("CA"));
        assert_eq!(location.coordinates.unwrap().latitude, 37.77);
    }

    #[test]
    fn test_map_detail_primary_without_location_data_maps_to_none() {
        let mut d = detail(Uuid::new_v4(), "APPROVED");
        d.locations = Some(vec![
            VideoLocation {
                id: Uuid::new_v4(),
                location_id: Uuid::new_v4(),
                is_primary: true,
                location: None,
            },
            // A later primary-flagged entry is not consulted
            VideoLocation {
                id: Uuid::new_v4(),
                location_id: Uuid::new_v4(),
                is_primary: true,
                location: Some(LocationSummary {
                    id: Uuid::new_v4(),
                    display_name: Some("Ignored".to_string()),
                    city: None,
                    state: None,
                    coordinates: None,
                }),
            },
        ]);

        let record = map_detail(d, Utc::now());
        assert!(record.primary_location.is_none());
    }

    #[test]
    fn test_map_detail_no_primary_flagged_maps_to_none() {
        let mut d = detail(Uuid::new_v4(), "APPROVED");
        d.locations = Some(vec![VideoLocation {
            id: Uuid::new_v4(),
            location_id: Uuid::new_v4(),
            is_primary: false,
            location: Some(LocationSummary {
                id: Uuid::new_v4(),
                display_name: None,
                city: None,
                state: None,
                coordinates: None,
            }),
        }]);

        let record = map_detail(d, Utc::now());
        assert!(record.primary_location.is_none());
    }
}
