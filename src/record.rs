//! Index record data structure.
//!
//! The [`IndexRecord`] is the denormalized search projection of one approved
//! video. It is written whole on every index pass (full replace of all
//! mutable fields) and deleted whole on rejection; readers never observe a
//! partially-written record.
//!
//! The full-text search vector over `title` + `description` is derived by
//! the store (a generated column in SQL, computed at query time in memory)
//! and intentionally has no field here.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Denormalized search record for one approved video.
///
/// `id` is the upstream video id, not store-generated, and never changes
/// once a record exists. A record exists iff the video was approved as of
/// the last successful synchronization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: Uuid,
    /// Short external platform identifier (e.g. the hosting site's video key).
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: Option<i32>,
    pub channel_id: Option<String>,
    pub channel_name: Option<String>,
    pub video_date: Option<NaiveDate>,
    /// Always present, possibly empty. Never `None` even when upstream
    /// omits the list.
    pub amendments: BTreeSet<String>,
    /// Always present, possibly empty.
    pub participants: BTreeSet<String>,
    /// The one location flagged primary upstream, if any.
    pub primary_location: Option<PrimaryLocation>,
    /// Timestamp of the last successful index write.
    pub indexed_at: DateTime<Utc>,
}

/// Location flagged primary on the upstream detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryLocation {
    pub id: Uuid,
    pub display_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    /// Present only when upstream supplied both latitude and longitude.
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl IndexRecord {
    /// State of the primary location, if the record has one.
    pub fn state(&self) -> Option<&str> {
        self.primary_location.as_ref()?.state.as_deref()
    }

    /// Coordinates of the primary location, if the record has them.
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.primary_location.as_ref()?.coordinates
    }
}
