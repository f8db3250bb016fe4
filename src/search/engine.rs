// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search execution and response shaping.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::filters::{BboxParseError, PageRequest, SearchCriteria, SearchRequest};
use crate::config::SearchServiceConfig;
use crate::metrics;
use crate::record::{Coordinates, IndexRecord, PrimaryLocation};
use crate::storage::{IndexStore, StorageError};

/// Failure modes of a search call.
///
/// `is_client_error()` tells a thin HTTP layer whether to answer 400 or
/// 500 without inspecting messages.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    InvalidBbox(#[from] BboxParseError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SearchError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, SearchError::InvalidBbox(_))
    }
}

/// Executes validated, ranked, paginated searches against an
/// [`IndexStore`].
///
/// Stateless and side-effect-free per call; one instance serves unbounded
/// concurrent searches.
pub struct SearchEngine {
    store: Arc<dyn IndexStore>,
    default_page_size: u32,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn IndexStore>, config: &SearchServiceConfig) -> Self {
        Self {
            store,
            default_page_size: config.default_page_size,
        }
    }

    /// Normalize `request`, run the filtered/ranked read, and shape the
    /// response.
    ///
    /// The only client error is a malformed bbox; unknown tag values have
    /// already degraded to "no restriction" by the time the store is
    /// queried. Query latency is measured end-to-end around the read and
    /// returned for observability only.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        let criteria = SearchCriteria::from_request(request)?;

        let size = if request.size == 0 {
            self.default_page_size
        } else {
            request.size
        };
        let page = PageRequest::new(request.page, size);

        let started = Instant::now();
        let result = self.store.search(&criteria, &page).await;
        let elapsed = started.elapsed();
        metrics::record_search_latency(elapsed);

        let found = match result {
            Ok(found) => found,
            Err(err) => {
                metrics::record_search_query("error");
                return Err(err.into());
            }
        };
        metrics::record_search_query("success");
        metrics::record_search_results(found.records.len());

        debug!(
            total = found.total,
            page = page.page(),
            size = page.size(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Search executed"
        );

        Ok(SearchResponse {
            pagination: Pagination {
                page: page.page(),
                size: page.size(),
                total_elements: found.total,
                total_pages: page.total_pages(found.total),
            },
            results: found.records.into_iter().map(VideoResult::from).collect(),
            query_time: elapsed.as_millis() as u64,
            query: request.query.clone(),
        })
    }
}

/// Wire-shaped search response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<VideoResult>,
    pub pagination: Pagination,
    /// End-to-end read latency in milliseconds.
    pub query_time: u64,
    /// The caller's query string, echoed verbatim.
    pub query: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    /// Effective (capped) page size.
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
}

/// One record, shaped for the response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResult {
    pub id: uuid::Uuid,
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: Option<i32>,
    pub channel_id: Option<String>,
    pub channel_name: Option<String>,
    pub video_date: Option<chrono::NaiveDate>,
    pub amendments: std::collections::BTreeSet<String>,
    pub participants: std::collections::BTreeSet<String>,
    /// Zero or one entry: the primary location, when the record has one.
    pub locations: Vec<LocationResult>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationResult {
    pub id: uuid::Uuid,
    pub display_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub coordinates: Option<Coordinates>,
}

impl From<PrimaryLocation> for LocationResult {
    fn from(location: PrimaryLocation) -> Self {
        Self {
            id: location.id,
            display_name: location.display_name,
            city: location.city,
            state: location.state,
            coordinates: location.coordinates,
        }
    }
}

impl From<IndexRecord> for VideoResult {
    fn from(record: IndexRecord) -> Self {
        Self {
            id: record.id,
            external_id: record.external_id,
            title: record.title,
            description: record.description,
            thumbnail_url: record.thumbnail_url,
            duration_seconds: record.duration_seconds,
            channel_id: record.channel_id,
            channel_name: record.channel_name,
            video_date: record.video_date,
            amendments: record.amendments,
            participants: record.participants,
            locations: record
                .primary_location
                .map(LocationResult::from)
                .into_iter()
                .collect(),
        }
    }
}
