//! Wire DTOs for the video-detail service response.
//!
//! These mirror `GET /videos/{id}` exactly (camelCase field names) and
//! tolerate absent optional fields; turning a detail into an
//! [`IndexRecord`](crate::record::IndexRecord) happens in the synchronizer,
//! not here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// Authoritative upstream representation of one video.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetail {
    pub id: Uuid,
    pub external_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<i32>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub channel_name: Option<String>,
    #[serde(default)]
    pub video_date: Option<NaiveDate>,
    #[serde(default)]
    pub amendments: Option<Vec<String>>,
    #[serde(default)]
    pub participants: Option<Vec<String>>,
    /// Moderation state as the upstream sees it right now. Indexing only
    /// proceeds for `"APPROVED"`; anything else means the event raced a
    /// later decision.
    pub status: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub locations: Option<Vec<VideoLocation>>,
}

/// One entry of the detail's location list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoLocation {
    pub id: Uuid,
    pub location_id: Uuid,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub location: Option<LocationSummary>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSummary {
    pub id: Uuid,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

/// Latitude/longitude pair. The wire either carries both or omits the
/// object, so "coordinates present" is atomic.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}
