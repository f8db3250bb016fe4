// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Filter normalization: untrusted request input → safe query criteria.
//!
//! Everything here runs before the store sees a predicate. Tag filters are
//! intersected with the fixed vocabularies (unknown values dropped, empty
//! result degrades to "no restriction"); the bounding box is parsed from
//! its wire form with typed client errors; the page size is capped
//! server-side.

use std::str::FromStr;

use thiserror::Error;

use crate::tags::{Amendment, Participant};

/// Hard server-side cap on page size, applied regardless of the requested
/// value and echoed back in the response.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Raw, untrusted search input as the caller supplied it.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub amendments: Vec<String>,
    pub participants: Vec<String>,
    pub state: Option<String>,
    /// Wire form `minLng,minLat,maxLng,maxLat`.
    pub bbox: Option<String>,
    /// Zero-based page index.
    pub page: u32,
    /// Requested page size; 0 means "use the configured default".
    pub size: u32,
}

/// Validated criteria, safe to hand to any [`IndexStore`](crate::storage::IndexStore).
///
/// `None` on any field means "no restriction". Present predicates are
/// ANDed. `amendments`/`participants` only ever contain vocabulary values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchCriteria {
    /// Trimmed, non-empty text query; ranking applies only when present.
    pub query: Option<String>,
    pub amendments: Option<Vec<String>>,
    pub participants: Option<Vec<String>>,
    pub state: Option<String>,
    pub bbox: Option<BoundingBox>,
}

impl SearchCriteria {
    /// Normalize a raw request. The only hard failure is a malformed bbox;
    /// every other invalid input degrades to an absent filter.
    pub fn from_request(request: &SearchRequest) -> Result<Self, BboxParseError> {
        let query = request
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_owned);

        let amendments = Amendment::sanitize(request.amendments.iter().map(String::as_str));
        let participants = Participant::sanitize(request.participants.iter().map(String::as_str));

        let state = request
            .state
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);

        let bbox = match request.bbox.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(raw.parse()?),
            _ => None,
        };

        Ok(Self {
            query,
            amendments,
            participants,
            state,
            bbox,
        })
    }
}

/// Rectangular geographic filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// A point matches iff latitude and longitude both fall inside the
    /// box (bounds inclusive). Records without coordinates never match.
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.min_lat
            && latitude <= self.max_lat
            && longitude >= self.min_lng
            && longitude <= self.max_lng
    }
}

/// Client error: the bbox parameter did not parse.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BboxParseError {
    #[error("invalid bbox format, expected minLng,minLat,maxLng,maxLat but got {found} values")]
    WrongCount { found: usize },
    #[error("invalid bbox format, '{value}' is not a number")]
    NotANumber { value: String },
}

impl FromStr for BoundingBox {
    type Err = BboxParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return Err(BboxParseError::WrongCount { found: parts.len() });
        }

        let mut values = [0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .trim()
                .parse()
                .map_err(|_| BboxParseError::NotANumber {
                    value: part.trim().to_string(),
                })?;
        }

        Ok(Self {
            min_lng: values[0],
            min_lat: values[1],
            max_lng: values[2],
            max_lat: values[3],
        })
    }
}

/// Zero-based pagination window with the server-side size cap baked in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    /// `size` is clamped into `1..=MAX_PAGE_SIZE`; the cap holds no matter
    /// what the caller requested.
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size: size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }

    /// Total page count for a result set of `total` records.
    pub fn total_pages(&self, total: u64) -> u32 {
        total.div_ceil(u64::from(self.size)) as u32
    }
}
