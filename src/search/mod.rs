// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search query engine.
//!
//! Turns free text + multi-valued filters + pagination into a safe,
//! ranked result page:
//!
//! ```text
//! SearchRequest (untrusted)
//!     ↓  filters::SearchCriteria::from_request
//!     │    trim query, whitelist tags, parse bbox, cap page size
//!     ↓
//! engine::SearchEngine ──→ IndexStore::search ──→ SearchResponse
//! ```
//!
//! The filter set is fixed (text, amendments, participants, state, bbox);
//! there is deliberately no general query DSL. Unknown tag values degrade
//! to "no restriction"; the only hard client error is a malformed bbox.

mod engine;
mod filters;

pub use engine::{
    LocationResult, Pagination, SearchEngine, SearchError, SearchResponse, VideoResult,
};
pub use filters::{
    BboxParseError, BoundingBox, PageRequest, SearchCriteria, SearchRequest, MAX_PAGE_SIZE,
};
