use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::traits::{IndexStore, SearchPage, StorageError};
use crate::record::IndexRecord;
use crate::search::{PageRequest, SearchCriteria};

/// In-memory index store.
///
/// Implements the full filter and ranking contract in process, so pipeline
/// and search semantics are testable without a database. Per-record writes
/// are atomic through the map's sharded locking; readers see the old or the
/// new record, never a torn one.
///
/// Text matching mirrors the SQL store's `plainto_tsquery` semantics
/// without stemming: every query term must appear as a whole word in
/// `title` + `description`, case-insensitively, and relevance is summed
/// term frequency.
pub struct InMemoryIndexStore {
    data: DashMap<Uuid, IndexRecord>,
}

impl InMemoryIndexStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }

    /// Get current record count
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Clear all records
    pub fn clear(&self) {
        self.data.clear();
    }
}

impl Default for InMemoryIndexStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexStore for InMemoryIndexStore {
    async fn get(&self, id: Uuid) -> Result<Option<IndexRecord>, StorageError> {
        Ok(self.data.get(&id).map(|r| r.value().clone()))
    }

    async fn upsert(&self, record: &IndexRecord) -> Result<(), StorageError> {
        self.data.insert(record.id, record.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StorageError> {
        Ok(self.data.remove(&id).is_some())
    }

    async fn exists(&self, id: Uuid) -> Result<bool, StorageError> {
        Ok(self.data.contains_key(&id))
    }

    async fn search(
        &self,
        criteria: &SearchCriteria,
        page: &PageRequest,
    ) -> Result<SearchPage, StorageError> {
        let query_terms: Vec<String> = criteria
            .query
            .as_deref()
            .map(tokenize)
            .unwrap_or_default();

        let mut matches: Vec<(f64, IndexRecord)> = Vec::new();
        for entry in self.data.iter() {
            let record = entry.value();
            if !matches_filters(record, criteria) {
                continue;
            }
            if query_terms.is_empty() {
                matches.push((0.0, record.clone()));
                continue;
            }
            if let Some(score) = relevance(record, &query_terms) {
                matches.push((score, record.clone()));
            }
        }

        // Rank: relevance desc when a query is present, recency as the
        // tie-break and as the sole order otherwise.
        matches.sort_by(|(score_a, rec_a), (score_b, rec_b)| {
            score_b
                .partial_cmp(score_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| rec_b.indexed_at.cmp(&rec_a.indexed_at))
        });

        let total = matches.len() as u64;
        let offset = page.offset() as usize;
        let records = matches
            .into_iter()
            .skip(offset)
            .take(page.size() as usize)
            .map(|(_, record)| record)
            .collect();

        Ok(SearchPage { records, total })
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn matches_filters(record: &IndexRecord, criteria: &SearchCriteria) -> bool {
    if let Some(wanted) = &criteria.amendments {
        if !wanted.iter().any(|tag| record.amendments.contains(tag)) {
            return false;
        }
    }
    if let Some(wanted) = &criteria.participants {
        if !wanted.iter().any(|tag| record.participants.contains(tag)) {
            return false;
        }
    }
    if let Some(state) = &criteria.state {
        if record.state() != Some(state.as_str()) {
            return false;
        }
    }
    if let Some(bbox) = &criteria.bbox {
        match record.coordinates() {
            Some(coords) => {
                if !bbox.contains(coords.latitude, coords.longitude) {
                    return false;
                }
            }
            // Records without coordinates never match a bbox filter.
            None => return false,
        }
    }
    true
}

/// Summed term frequency over title + description; `None` when any query
/// term is missing (all terms must match).
fn relevance(record: &IndexRecord, query_terms: &[String]) -> Option<f64> {
    let mut text = tokenize(&record.title);
    if let Some(description) = &record.description {
        text.extend(tokenize(description));
    }

    let mut score = 0usize;
    for term in query_terms {
        let count = text.iter().filter(|word| *word == term).count();
        if count == 0 {
            return None;
        }
        score += count;
    }
    Some(score as f64)
}
