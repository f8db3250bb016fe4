use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::record::IndexRecord;
use crate::search::{PageRequest, SearchCriteria};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// One page of a filtered, ranked read.
#[derive(Debug, Clone)]
pub struct SearchPage {
    /// Records for the requested page, in rank order.
    pub records: Vec<IndexRecord>,
    /// Total records matching the criteria, across all pages.
    pub total: u64,
}

/// Persistence boundary for the search index.
///
/// Mutations are single-record and atomic: a concurrent reader observes the
/// old record or the new one, never a torn write. The filtered read applies
/// the criteria exactly as documented on
/// [`SearchCriteria`](crate::search::SearchCriteria): all present predicates
/// ANDed, absent predicates always pass, text-ranked when a query is
/// present and recency-ordered otherwise.
#[async_trait]
pub trait IndexStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<IndexRecord>, StorageError>;

    /// Insert or fully replace the record with the same id.
    async fn upsert(&self, record: &IndexRecord) -> Result<(), StorageError>;

    /// Delete by id. Returns whether a record existed; absence is not an
    /// error.
    async fn delete(&self, id: Uuid) -> Result<bool, StorageError>;

    async fn exists(&self, id: Uuid) -> Result<bool, StorageError>;

    async fn search(
        &self,
        criteria: &SearchCriteria,
        page: &PageRequest,
    ) -> Result<SearchPage, StorageError>;
}
