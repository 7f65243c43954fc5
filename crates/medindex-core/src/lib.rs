//! Medindex Core Library
//!
//! Ingestion and search core for a registry of regulated medicines published
//! as a periodically re-issued agency spreadsheet.
//!
//! # Architecture
//!
//! ```text
//! Listing page ──locate──▶ Spreadsheet URL ──download──▶ Transient XLSX
//!                                                             │
//!                                                           parse
//!                                                             │
//!                                                  Vec<MedicineRecord>
//!                                                             │
//!                                                         reconcile
//!                                                             │
//!                                                      SQLite store ◀──search── callers
//! ```
//!
//! The refresh pipeline chains three independently failing externals (a
//! scraped page, a binary download, the store) and always converges: the
//! store is keyed by brand name and every refresh is a full-overwrite
//! upsert, so re-running against an unchanged source changes nothing.
//!
//! # Modules
//!
//! - [`cache`]: search cache seam and in-memory implementation
//! - [`config`]: source portal configuration
//! - [`db`]: SQLite store with key-based reconciliation and brand search
//! - [`fetch`]: bounded-time download to a scoped temporary file
//! - [`models`]: domain types ([`MedicineRecord`])
//! - [`parser`]: fault-tolerant twelve-column XLSX parsing
//! - [`pipeline`]: stage orchestration, cleanup, and failure categories
//! - [`source`]: listing-page scraping for the latest spreadsheet link

pub mod cache;
pub mod config;
pub mod db;
pub mod fetch;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod source;

// Re-export commonly used types
pub use cache::{MemoryCache, SearchCache};
pub use config::SourceConfig;
pub use db::Database;
pub use models::MedicineRecord;
pub use pipeline::{CancelToken, RefreshError, RefreshPipeline, RefreshReport};

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::fetch::HttpFetcher;
use crate::parser::XlsxParser;
use crate::source::HtmlSourceLocator;

// =========================================================================
// Service Error Type
// =========================================================================

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("search query must not be empty")]
    InvalidQuery,

    #[error("store error: {0}")]
    Store(#[from] db::DbError),

    #[error("store lock poisoned")]
    LockPoisoned,
}

impl<T> From<std::sync::PoisonError<T>> for ServiceError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        ServiceError::LockPoisoned
    }
}

// =========================================================================
// Refresh Outcome
// =========================================================================

/// What a triggered refresh reports back: a count and either `"ok"` or the
/// failure category. Never an unwound error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RefreshOutcome {
    pub record_count: usize,
    pub outcome: String,
}

// =========================================================================
// Main API Object
// =========================================================================

/// Boundary object consumed by the (out-of-scope) HTTP layer: an on-demand
/// refresh trigger plus a cached brand-name search.
///
/// The store handle and the optional cache are injected at construction -
/// no ambient singletons - so the service can be exercised against an
/// in-memory store and a fake cache.
pub struct MedicineService {
    db: Arc<Mutex<Database>>,
    config: SourceConfig,
    cache: Option<Box<dyn SearchCache>>,
}

impl MedicineService {
    pub fn new(db: Database, config: SourceConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            config,
            cache: None,
        }
    }

    /// Front the search path with a cache.
    pub fn with_cache(mut self, cache: Box<dyn SearchCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Shared handle to the underlying store.
    pub fn store(&self) -> Arc<Mutex<Database>> {
        Arc::clone(&self.db)
    }

    /// Trigger one refresh of the store from the source portal.
    ///
    /// Failures are caught here and reported as a category string; this
    /// never propagates an error to the hosting process.
    pub fn refresh(&self) -> RefreshOutcome {
        let locator = match HtmlSourceLocator::new(&self.config) {
            Ok(locator) => locator,
            Err(e) => return Self::failed_outcome(RefreshError::Source(e)),
        };
        let fetcher = HttpFetcher::new(self.config.request_timeout);
        let pipeline = RefreshPipeline::new(locator, fetcher, XlsxParser);

        match pipeline.run(&self.db) {
            Ok(report) => RefreshOutcome {
                record_count: report.record_count,
                outcome: "ok".to_string(),
            },
            Err(e) => Self::failed_outcome(e),
        }
    }

    /// Search stored medicines by brand-name fragment.
    ///
    /// Returns uppercased brand names, at most the store's search cap,
    /// empty when nothing matches. An empty or whitespace query is the
    /// caller's validation error.
    pub fn search(&self, query: &str) -> Result<Vec<String>, ServiceError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ServiceError::InvalidQuery);
        }

        let cache_key = format!("medicine_search_{}", query.to_lowercase());
        if let Some(cache) = &self.cache {
            if let Some(payload) = cache.get(&cache_key) {
                if let Ok(names) = serde_json::from_str::<Vec<String>>(&payload) {
                    tracing::debug!(key = %cache_key, "search cache hit");
                    return Ok(names);
                }
            }
        }

        let names: Vec<String> = {
            let db = self.db.lock()?;
            db.search_by_brand(query)?
                .into_iter()
                .map(|m| m.brand_name.to_uppercase())
                .collect()
        };

        if let Some(cache) = &self.cache {
            if let Ok(payload) = serde_json::to_string(&names) {
                cache.put(&cache_key, payload);
            }
        }

        Ok(names)
    }

    fn failed_outcome(error: RefreshError) -> RefreshOutcome {
        tracing::error!(error = %error, category = error.category(), "refresh failed");
        RefreshOutcome {
            record_count: 0,
            outcome: error.category().to_string(),
        }
    }
}
