//! Request-scoped memo of panel results.
//!
//! A cache lives for one render cycle only. It is keyed by the rendered
//! predicate, its bound values, and the panel id, so the same panel asked
//! for twice under the same filters runs once.

use std::collections::HashMap;

use securecheck_analytics_models::{PanelId, PanelTable};
use securecheck_database::SqlValue;

use crate::AnalyticsError;
use crate::filter::FilterPredicate;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    clause: String,
    params: Vec<SqlValue>,
    panel: PanelId,
}

/// Panel results computed during one request.
#[derive(Debug, Default)]
pub struct PanelCache {
    entries: HashMap<CacheKey, PanelTable>,
    hits: u64,
}

impl PanelCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached table for this predicate and panel, or runs
    /// `fetch` and remembers its result. Failed fetches are not cached.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `fetch`.
    pub fn get_or_fetch(
        &mut self,
        predicate: &FilterPredicate,
        panel: PanelId,
        fetch: impl FnOnce() -> Result<PanelTable, AnalyticsError>,
    ) -> Result<PanelTable, AnalyticsError> {
        let key = CacheKey {
            clause: predicate.where_clause(),
            params: predicate.params().to_vec(),
            panel,
        };

        if let Some(table) = self.entries.get(&key) {
            self.hits += 1;
            log::debug!("Panel cache hit for {panel}");
            return Ok(table.clone());
        }

        let table = fetch()?;
        self.entries.insert(key, table.clone());
        Ok(table)
    }

    /// Number of cached panel results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether nothing has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of lookups answered from the cache.
    #[must_use]
    pub const fn hits(&self) -> u64 {
        self.hits
    }
}
