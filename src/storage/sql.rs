// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Postgres index store.
//!
//! One denormalized row per approved video:
//!
//! ```sql
//! CREATE TABLE search_videos (
//!   id UUID PRIMARY KEY,
//!   ...scalar display fields...,
//!   amendments TEXT[] NOT NULL,       -- filtered with && (array overlap)
//!   participants TEXT[] NOT NULL,
//!   primary_location_* columns,       -- split for state/bbox predicates
//!   indexed_at TIMESTAMPTZ NOT NULL,
//!   search_vector tsvector GENERATED  -- title + description, store-owned
//! )
//! ```
//!
//! The search vector is a generated column: the database recomputes it on
//! every write and application code cannot set it. Ranking uses
//! `ts_rank_cd` against `plainto_tsquery`, with `indexed_at` as the
//! tie-break and as the sole order when no text query is present.
//!
//! Every user-supplied value is bound as a parameter. The tag arrays are
//! additionally whitelisted upstream (see [`crate::tags`]), so nothing
//! outside the fixed vocabularies reaches a bind either.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::collections::BTreeSet;
use std::time::Duration;
use uuid::Uuid;

use super::traits::{IndexStore, SearchPage, StorageError};
use crate::record::{Coordinates, IndexRecord, PrimaryLocation};
use crate::resilience::retry::{retry, RetryConfig};
use crate::search::{PageRequest, SearchCriteria};

const SEARCH_COLUMNS: &str = "id, external_id, title, description, thumbnail_url, \
     duration_seconds, channel_id, channel_name, video_date, amendments, participants, \
     primary_location_id, primary_location_name, primary_location_city, \
     primary_location_state, primary_location_lat, primary_location_lng, indexed_at";

const SEARCH_PREDICATES: &str = "($1::text IS NULL OR search_vector @@ plainto_tsquery('english', $1)) \
     AND ($2::text[] IS NULL OR amendments && $2) \
     AND ($3::text[] IS NULL OR participants && $3) \
     AND ($4::text IS NULL OR primary_location_state = $4) \
     AND ($5::float8 IS NULL OR (primary_location_lat BETWEEN $5 AND $6 \
          AND primary_location_lng BETWEEN $7 AND $8))";

pub struct PgIndexStore {
    pool: PgPool,
}

impl PgIndexStore {
    /// Connect and ensure the schema exists, with startup-mode retry
    /// (fails fast if the connection string is wrong).
    pub async fn new(connection_string: &str) -> Result<Self, StorageError> {
        let pool = retry("sql_connect", &RetryConfig::startup(), || async {
            PgPoolOptions::new()
                .max_connections(20)
                .acquire_timeout(Duration::from_secs(10))
                .idle_timeout(Duration::from_secs(300))
                .connect(connection_string)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))
        })
        .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Get a clone of the connection pool for sharing.
    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    async fn init_schema(&self) -> Result<(), StorageError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS search_videos (
                id UUID PRIMARY KEY,
                external_id VARCHAR(16) NOT NULL,
                title VARCHAR(500) NOT NULL,
                description TEXT,
                thumbnail_url VARCHAR(500),
                duration_seconds INTEGER,
                channel_id VARCHAR(50),
                channel_name TEXT,
                video_date DATE,
                amendments TEXT[] NOT NULL DEFAULT '{}',
                participants TEXT[] NOT NULL DEFAULT '{}',
                primary_location_id UUID,
                primary_location_name TEXT,
                primary_location_city TEXT,
                primary_location_state TEXT,
                primary_location_lat DOUBLE PRECISION,
                primary_location_lng DOUBLE PRECISION,
                indexed_at TIMESTAMPTZ NOT NULL,
                search_vector tsvector GENERATED ALWAYS AS (
                    to_tsvector('english', coalesce(title, '') || ' ' || coalesce(description, ''))
                ) STORED
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_search_videos_vector
             ON search_videos USING GIN (search_vector)",
            "CREATE INDEX IF NOT EXISTS idx_search_videos_amendments
             ON search_videos USING GIN (amendments)",
            "CREATE INDEX IF NOT EXISTS idx_search_videos_participants
             ON search_videos USING GIN (participants)",
            "CREATE INDEX IF NOT EXISTS idx_search_videos_indexed_at
             ON search_videos (indexed_at DESC)",
        ];

        for sql in statements {
            retry("sql_init_schema", &RetryConfig::startup(), || async {
                sqlx::query(sql)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| StorageError::Backend(e.to_string()))
            })
            .await?;
        }

        Ok(())
    }

    fn map_row(row: &PgRow) -> Result<IndexRecord, StorageError> {
        let backend = |e: sqlx::Error| StorageError::Backend(e.to_string());

        let amendments: Vec<String> = row.try_get("amendments").map_err(backend)?;
        let participants: Vec<String> = row.try_get("participants").map_err(backend)?;

        let primary_location_id: Option<Uuid> =
            row.try_get("primary_location_id").map_err(backend)?;
        let primary_location = match primary_location_id {
            Some(id) => {
                let latitude: Option<f64> = row.try_get("primary_location_lat").map_err(backend)?;
                let longitude: Option<f64> =
                    row.try_get("primary_location_lng").map_err(backend)?;
                Some(PrimaryLocation {
                    id,
                    display_name: row.try_get("primary_location_name").map_err(backend)?,
                    city: row.try_get("primary_location_city").map_err(backend)?,
                    state: row.try_get("primary_location_state").map_err(backend)?,
                    coordinates: match (latitude, longitude) {
                        (Some(latitude), Some(longitude)) => Some(Coordinates {
                            latitude,
                            longitude,
                        }),
                        _ => None,
                    },
                })
            }
            None => None,
        };

        Ok(IndexRecord {
            id: row.try_get("id").map_err(backend)?,
            external_id: row.try_get("external_id").map_err(backend)?,
            title: row.try_get("title").map_err(backend)?,
            description: row.try_get("description").map_err(backend)?,
            thumbnail_url: row.try_get("thumbnail_url").map_err(backend)?,
            duration_seconds: row.try_get("duration_seconds").map_err(backend)?,
            channel_id: row.try_get("channel_id").map_err(backend)?,
            channel_name: row.try_get("channel_name").map_err(backend)?,
            video_date: row.try_get("video_date").map_err(backend)?,
            amendments: amendments.into_iter().collect::<BTreeSet<_>>(),
            participants: participants.into_iter().collect::<BTreeSet<_>>(),
            primary_location,
            indexed_at: row.try_get("indexed_at").map_err(backend)?,
        })
    }
}

#[async_trait]
impl IndexStore for PgIndexStore {
    async fn get(&self, id: Uuid) -> Result<Option<IndexRecord>, StorageError> {
        retry("sql_get", &RetryConfig::query(), || async {
            let row = sqlx::query(&format!(
                "SELECT {SEARCH_COLUMNS} FROM search_videos WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

            row.as_ref().map(Self::map_row).transpose()
        })
        .await
    }

    async fn upsert(&self, record: &IndexRecord) -> Result<(), StorageError> {
        let amendments: Vec<String> = record.amendments.iter().cloned().collect();
        let participants: Vec<String> = record.participants.iter().cloned().collect();
        let location = record.primary_location.as_ref();
        let coordinates = location.and_then(|l| l.coordinates);

        // Single statement: the whole row replaces atomically or not at all.
        let sql = "INSERT INTO search_videos (\
                id, external_id, title, description, thumbnail_url, duration_seconds, \
                channel_id, channel_name, video_date, amendments, participants, \
                primary_location_id, primary_location_name, primary_location_city, \
                primary_location_state, primary_location_lat, primary_location_lng, indexed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
             ON CONFLICT (id) DO UPDATE SET \
                external_id = EXCLUDED.external_id, \
                title = EXCLUDED.title, \
                description = EXCLUDED.description, \
                thumbnail_url = EXCLUDED.thumbnail_url, \
                duration_seconds = EXCLUDED.duration_seconds, \
                channel_id = EXCLUDED.channel_id, \
                channel_name = EXCLUDED.channel_name, \
                video_date = EXCLUDED.video_date, \
                amendments = EXCLUDED.amendments, \
                participants = EXCLUDED.participants, \
                primary_location_id = EXCLUDED.primary_location_id, \
                primary_location_name = EXCLUDED.primary_location_name, \
                primary_location_city = EXCLUDED.primary_location_city, \
                primary_location_state = EXCLUDED.primary_location_state, \
                primary_location_lat = EXCLUDED.primary_location_lat, \
                primary_location_lng = EXCLUDED.primary_location_lng, \
                indexed_at = EXCLUDED.indexed_at";

        retry("sql_upsert", &RetryConfig::query(), || async {
            sqlx::query(sql)
                .bind(record.id)
                .bind(&record.external_id)
                .bind(&record.title)
                .bind(&record.description)
                .bind(&record.thumbnail_url)
                .bind(record.duration_seconds)
                .bind(&record.channel_id)
                .bind(&record.channel_name)
                .bind(record.video_date)
                .bind(&amendments)
                .bind(&participants)
                .bind(location.map(|l| l.id))
                .bind(location.and_then(|l| l.display_name.as_deref()))
                .bind(location.and_then(|l| l.city.as_deref()))
                .bind(location.and_then(|l| l.state.as_deref()))
                .bind(coordinates.map(|c| c.latitude))
                .bind(coordinates.map(|c| c.longitude))
                .bind(record.indexed_at)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StorageError> {
        retry("sql_delete", &RetryConfig::query(), || async {
            let result = sqlx::query("DELETE FROM search_videos WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            Ok(result.rows_affected() > 0)
        })
        .await
    }

    async fn exists(&self, id: Uuid) -> Result<bool, StorageError> {
        retry("sql_exists", &RetryConfig::query(), || async {
            let row = sqlx::query("SELECT 1 FROM search_videos WHERE id = $1 LIMIT 1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            Ok(row.is_some())
        })
        .await
    }

    async fn search(
        &self,
        criteria: &SearchCriteria,
        page: &PageRequest,
    ) -> Result<SearchPage, StorageError> {
        let (min_lat, max_lat, min_lng, max_lng) = match &criteria.bbox {
            Some(bbox) => (
                Some(bbox.min_lat),
                Some(bbox.max_lat),
                Some(bbox.min_lng),
                Some(bbox.max_lng),
            ),
            None => (None, None, None, None),
        };

        let count_sql = format!("SELECT COUNT(*) AS total FROM search_videos WHERE {SEARCH_PREDICATES}");
        let page_sql = format!(
            "SELECT {SEARCH_COLUMNS} FROM search_videos \
             WHERE {SEARCH_PREDICATES} \
             ORDER BY CASE WHEN $1::text IS NULL THEN 0 \
                      ELSE ts_rank_cd(search_vector, plainto_tsquery('english', $1)) END DESC, \
                      indexed_at DESC \
             LIMIT $9 OFFSET $10"
        );

        retry("sql_search", &RetryConfig::query(), || async {
            let count_row = sqlx::query(&count_sql)
                .bind(&criteria.query)
                .bind(&criteria.amendments)
                .bind(&criteria.participants)
                .bind(&criteria.state)
                .bind(min_lat)
                .bind(max_lat)
                .bind(min_lng)
                .bind(max_lng)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            let total: i64 = count_row
                .try_get("total")
                .map_err(|e| StorageError::Backend(e.to_string()))?;

            let rows = sqlx::query(&page_sql)
                .bind(&criteria.query)
                .bind(&criteria.amendments)
                .bind(&criteria.participants)
                .bind(&criteria.state)
                .bind(min_lat)
                .bind(max_lat)
                .bind(min_lng)
                .bind(max_lng)
                .bind(i64::from(page.size()))
                .bind(page.offset() as i64)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;

            let mut records = Vec::with_capacity(rows.len());
            for row in &rows {
                records.push(Self::map_row(row)?);
            }

            Ok(SearchPage {
                records,
                total: total as u64,
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_record(title: &str) -> IndexRecord {
        IndexRecord {
            id: Uuid::new_v4(),
            external_id: "abc123".to_string(),
            title: title.to_string(),
            description: Some("a description".to_string()),
            thumbnail_url: None,
            duration_seconds: Some(120),
            channel_id: None,
            channel_name: None,
            video_date: None,
            amendments: ["FIRST".to_string()].into_iter().collect(),
            participants: ["POLICE".to_string()].into_iter().collect(),
            primary_location: None,
            indexed_at: Utc::now(),
        }
    }

    async fn test_store() -> PgIndexStore {
        let url = std::env::var("ATLAS_TEST_DATABASE_URL")
            .expect("set ATLAS_TEST_DATABASE_URL to run Postgres tests");
        PgIndexStore::new(&url).await.unwrap()
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL server (set ATLAS_TEST_DATABASE_URL)"]
    async fn test_upsert_get_delete_round_trip() {
        let store = test_store().await;
        let record = test_record("Round trip");

        store.upsert(&record).await.unwrap();
        let found = store.get(record.id).await.unwrap().unwrap();
        assert_eq!(found.title, "Round trip");
        assert_eq!(found.amendments, record.amendments);

        assert!(store.delete(record.id).await.unwrap());
        assert!(!store.delete(record.id).await.unwrap());
        assert!(store.get(record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL server (set ATLAS_TEST_DATABASE_URL)"]
    async fn test_text_search_ranks_and_counts() {
        let store = test_store().await;
        let record = test_record("Police audit at the station");
        store.upsert(&record).await.unwrap();

        let criteria = SearchCriteria {
            query: Some("police audit".to_string()),
            ..Default::default()
        };
        let page = store
            .search(&criteria, &PageRequest::new(0, 10))
            .await
            .unwrap();

        assert!(page.total >= 1);
        assert!(page.records.iter().any(|r| r.id == record.id));

        store.delete(record.id).await.unwrap();
    }
}
