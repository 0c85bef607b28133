/*!
 * Persistent rows of the translation cache.
 */

use anyhow::Result;
use log::debug;
use rusqlite::{OptionalExtension, params};

use super::DatabaseConnection;

/// One persisted cache entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    pub cache_key: String,
    pub source_text: String,
    pub source_language: String,
    pub target_language: String,
    pub domain: String,
    pub provider: String,
    pub translated_text: String,
    /// RFC 3339 timestamp
    pub created_at: String,
}

/// Cache table access
#[derive(Debug, Clone)]
pub struct CacheStore {
    db: DatabaseConnection,
}

impl CacheStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert a row unless the key is already present.
    ///
    /// Returns `true` when this call stored the row.
    pub async fn insert(&self, record: CacheRecord) -> Result<bool> {
        self.db
            .execute_async(move |conn| {
                let changed = conn.execute(
                    r#"
                    INSERT OR IGNORE INTO translation_cache (
                        cache_key, source_text, source_language, target_language,
                        domain, provider, translated_text, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                    params![
                        record.cache_key,
                        record.source_text,
                        record.source_language,
                        record.target_language,
                        record.domain,
                        record.provider,
                        record.translated_text,
                        record.created_at,
                    ],
                )?;
                Ok(changed > 0)
            })
            .await
    }

    /// Translated text and creation time stored under `cache_key`
    pub async fn get(&self, cache_key: &str) -> Result<Option<(String, String)>> {
        let cache_key = cache_key.to_string();
        self.db
            .execute_async(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT translated_text, created_at FROM translation_cache WHERE cache_key = ?1",
                        [cache_key],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;
                Ok(row)
            })
            .await
    }

    /// Every stored (key, translated text, created at) triple
    pub fn load_all(&self) -> Result<Vec<(String, String, String)>> {
        self.db.execute(|conn| {
            let mut stmt = conn.prepare("SELECT cache_key, translated_text, created_at FROM translation_cache")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            debug!("Loaded {} persisted cache entries", rows.len());
            Ok(rows)
        })
    }

    pub async fn count(&self) -> Result<i64> {
        self.db
            .execute_async(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM translation_cache", [], |row| row.get(0))?))
            .await
    }
}
