// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! HTTP client for the video-detail service.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use super::detail::VideoDetail;
use super::{FetchError, VideoFetcher};
use crate::config::SearchServiceConfig;

/// [`VideoFetcher`] implementation over `GET {base_url}/videos/{id}`.
pub struct HttpVideoClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpVideoClient {
    /// Build a client with bounded connect and total timeouts. A request
    /// that outlives `fetch_timeout_ms` is reported as a retryable connect
    /// failure, never left hanging.
    pub fn new(base_url: impl Into<String>, config: &SearchServiceConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.fetch_timeout_ms))
            .build()?;
        Ok(Self {
            base_url: trim_trailing_slash(base_url.into()),
            http,
        })
    }

    fn video_url(&self, video_id: Uuid) -> String {
        format!("{}/videos/{}", self.base_url, video_id)
    }
}

#[async_trait]
impl VideoFetcher for HttpVideoClient {
    async fn fetch(&self, video_id: Uuid) -> Result<VideoDetail, FetchError> {
        let url = self.video_url(video_id);
        debug!(video_id = %video_id, %url, "Fetching video detail");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| classify_transport_error(video_id, &err))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let err = classify_status(video_id, status);
            if err.is_retryable() {
                warn!(video_id = %video_id, status, "Video service error response");
            }
            return Err(err);
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| classify_transport_error(video_id, &err))?;

        // An empty 2xx body means the upstream has nothing for this id.
        if body.is_empty() {
            return Err(FetchError::NotFound { video_id });
        }

        serde_json::from_slice(&body).map_err(|err| FetchError::Unexpected {
            video_id,
            reason: format!("malformed detail body: {err}"),
        })
    }
}

/// Classify a non-2xx status. Pure so the table in the module docs is
/// testable without a live server.
fn classify_status(video_id: Uuid, status: u16) -> FetchError {
    match status {
        404 => FetchError::NotFound { video_id },
        503 | 504 => FetchError::Unavailable { video_id, status },
        _ => FetchError::Upstream { video_id, status },
    }
}

/// Classify a reqwest error raised before a usable response existed.
fn classify_transport_error(video_id: Uuid, err: &reqwest::Error) -> FetchError {
    if err.is_timeout() || err.is_connect() {
        FetchError::ConnectFailed {
            video_id,
            reason: err.to_string(),
        }
    } else {
        FetchError::Unexpected {
            video_id,
            reason: err.to_string(),
        }
    }
}

fn trim_trailing_slash(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}
