// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Upstream video-detail fetching.
//!
//! The moderation pipeline is only as reliable as its failure
//! classification: whether an event is retried, dead-lettered, or dropped
//! is decided entirely by the [`FetchError`] variant a fetch produces.
//! The taxonomy is a closed enum rather than an exception hierarchy so
//! retry policy is decidable by inspecting one value.
//!
//! | Upstream behavior                          | Outcome         | Retryable |
//! |--------------------------------------------|-----------------|-----------|
//! | 200 with body                              | `VideoDetail`   | n/a       |
//! | 200 with empty body                        | `NotFound`      | no        |
//! | 404                                        | `NotFound`      | no        |
//! | 503, 504                                   | `Unavailable`   | yes       |
//! | other 5xx                                  | `Upstream`      | yes       |
//! | other 4xx                                  | `Upstream`      | no        |
//! | connect / DNS / timeout before response    | `ConnectFailed` | yes       |
//! | body deserialization, anything else        | `Unexpected`    | yes       |
//!
//! "Video not found" is a distinguishable outcome, never a silent empty
//! result: a video can legitimately disappear between approval and
//! indexing, and callers skip it without alerting.

mod detail;
mod http;

pub use detail::{Coordinates, LocationSummary, VideoDetail, VideoLocation};
pub use http::HttpVideoClient;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Failure modes of a detail fetch. Every variant carries the video id for
/// log and metric correlation.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The upstream service has no such video (404 or empty 2xx body).
    #[error("video {video_id} not found upstream")]
    NotFound { video_id: Uuid },

    /// The upstream service is temporarily unavailable (503/504).
    #[error("video service temporarily unavailable fetching {video_id} (status {status})")]
    Unavailable { video_id: Uuid, status: u16 },

    /// No response was received: connection refused, DNS failure, or the
    /// bounded fetch timeout elapsed first.
    #[error("connection to video service failed fetching {video_id}: {reason}")]
    ConnectFailed { video_id: Uuid, reason: String },

    /// Any other non-2xx response. Retryable only for server errors.
    #[error("video service returned status {status} fetching {video_id}")]
    Upstream { video_id: Uuid, status: u16 },

    /// Deserialization failure or any other unclassified error.
    #[error("unexpected failure fetching {video_id}: {reason}")]
    Unexpected { video_id: Uuid, reason: String },
}

impl FetchError {
    /// The video the failed fetch was for.
    pub fn video_id(&self) -> Uuid {
        match self {
            FetchError::NotFound { video_id }
            | FetchError::Unavailable { video_id, .. }
            | FetchError::ConnectFailed { video_id, .. }
            | FetchError::Upstream { video_id, .. }
            | FetchError::Unexpected { video_id, .. } => *video_id,
        }
    }

    /// Whether the triggering event should be redelivered.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::NotFound { .. } => false,
            FetchError::Unavailable { .. } => true,
            FetchError::ConnectFailed { .. } => true,
            FetchError::Upstream { status, .. } => *status >= 500,
            FetchError::Unexpected { .. } => true,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::NotFound { .. } => "not_found",
            FetchError::Unavailable { .. } => "unavailable",
            FetchError::ConnectFailed { .. } => "connect_failed",
            FetchError::Upstream { .. } => "upstream",
            FetchError::Unexpected { .. } => "unexpected",
        }
    }
}

/// Fetches one video's authoritative detail by id.
///
/// The seam between the synchronizer and the HTTP transport; tests swap in
/// stub implementations.
#[async_trait]
pub trait VideoFetcher: Send + Sync {
    async fn fetch(&self, video_id: Uuid) -> Result<VideoDetail, FetchError>;
}
