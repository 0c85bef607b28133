/*!
 * Content-addressed translation cache.
 *
 * Keys are SHA-256 digests of the normalized source text, the language pair,
 * the domain profile and the provider identifier. An entry is never replaced:
 * when two writers race on the same key the first one wins and the later
 * insert returns the stored value instead.
 *
 * A cache may be backed by a SQLite table; persisted rows are loaded when the
 * cache is opened and new entries are written through.
 */

use chrono::{DateTime, Utc};
use log::{debug, warn};
use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::database::{CacheRecord, CacheStore, DatabaseConnection};
use crate::document::DomainProfile;

const FIELD_SEPARATOR: &str = "\u{1f}";

/// Deterministic cache key (hex SHA-256)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(
        source_text: &str,
        source_language: &str,
        target_language: &str,
        domain: DomainProfile,
        provider_id: &str,
    ) -> Self {
        let text = normalize_text(source_text);
        let source = source_language.trim().to_lowercase();
        let target = target_language.trim().to_lowercase();
        let fields: [&str; 5] = [&text, &source, &target, domain.as_str(), provider_id];

        let mut hasher = Sha256::new();
        hasher.update(fields.join(FIELD_SEPARATOR).as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trim and collapse inner whitespace runs to a single space
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Immutable cached translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub translated: String,
    pub created_at: DateTime<Utc>,
}

/// Hit/miss counters for reports
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
    pub hit_rate: f64,
}

/// Everything needed to persist an entry besides the key
#[derive(Debug, Clone, Copy)]
pub struct CacheContext<'a> {
    pub source_text: &'a str,
    pub source_language: &'a str,
    pub target_language: &'a str,
    pub domain: DomainProfile,
    pub provider_id: &'a str,
}

impl CacheContext<'_> {
    pub fn key(&self) -> CacheKey {
        CacheKey::new(
            self.source_text,
            self.source_language,
            self.target_language,
            self.domain,
            self.provider_id,
        )
    }
}

/// Translation cache shared by every job of a batch
#[derive(Debug, Clone)]
pub struct TranslationCache {
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
    hits: Arc<AtomicUsize>,
    misses: Arc<AtomicUsize>,
    store: Option<CacheStore>,
    enabled: bool,
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(true)
    }
}

impl TranslationCache {
    /// In-memory cache
    pub fn new(enabled: bool) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            hits: Arc::new(AtomicUsize::new(0)),
            misses: Arc::new(AtomicUsize::new(0)),
            store: None,
            enabled,
        }
    }

    /// Cache backed by the SQLite table of `db`, preloaded with its rows
    pub fn persistent(db: DatabaseConnection) -> anyhow::Result<Self> {
        let store = CacheStore::new(db);
        let mut entries = HashMap::new();

        for (key, translated, created_at) in store.load_all()? {
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            entries.insert(CacheKey(key), CacheEntry { translated, created_at });
        }

        let cache = Self::new(true);
        *cache.entries.write() = entries;
        Ok(Self {
            store: Some(store),
            ..cache
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    /// Look up a translation, counting the hit or miss
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        if !self.enabled {
            return None;
        }

        match self.entries.read().get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for {}", &key.as_str()[..12]);
                Some(entry.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss for {}", &key.as_str()[..12]);
                None
            }
        }
    }

    /// Store a translation unless the key is already present; returns the value now cached
    pub async fn insert(&self, context: CacheContext<'_>, translated: &str) -> String {
        if !self.enabled {
            return translated.to_string();
        }

        let key = context.key();
        let created_at = Utc::now();

        let stored = {
            let mut entries = self.entries.write();
            match entries.entry(key.clone()) {
                Entry::Occupied(existing) => {
                    debug!("Cache already holds {}, keeping first value", &key.as_str()[..12]);
                    return existing.get().translated.clone();
                }
                Entry::Vacant(slot) => slot
                    .insert(CacheEntry {
                        translated: translated.to_string(),
                        created_at,
                    })
                    .translated
                    .clone(),
            }
        };

        debug!(
            "Cached translation for '{}' ({} -> {})",
            truncate_text(context.source_text, 30),
            context.source_language,
            context.target_language
        );

        if let Some(store) = &self.store {
            let record = CacheRecord {
                cache_key: key.as_str().to_string(),
                source_text: normalize_text(context.source_text),
                source_language: context.source_language.to_string(),
                target_language: context.target_language.to_string(),
                domain: context.domain.as_str().to_string(),
                provider: context.provider_id.to_string(),
                translated_text: stored.clone(),
                created_at: created_at.to_rfc3339(),
            };
            if let Err(e) = store.insert(record).await {
                warn!("Failed to persist cache entry: {}", e);
            }
        }

        stored
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            hits,
            misses,
            entries: self.len(),
            hit_rate: if total > 0 { hits as f64 / total as f64 } else { 0.0 },
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Truncate text to a maximum number of characters with ellipsis
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    }
}
