use crate::types::{CacheKey, RecomputeMode};

/// Client side of a server-side cached result set.
///
/// The handle does no I/O. Whenever a key stops being current it is handed
/// back to the caller, which must release it on the store in the same step.
#[derive(Debug, Default)]
pub struct CacheHandle {
    key: Option<CacheKey>,
}

impl CacheHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_key(&self) -> Option<&CacheKey> {
        self.key.as_ref()
    }

    /// Make `key` current, returning the previous key if it differs.
    #[must_use = "a replaced cache key must be released on the store"]
    pub fn adopt(&mut self, key: CacheKey) -> Option<CacheKey> {
        match self.key.replace(key) {
            Some(old) if Some(&old) != self.key.as_ref() => {
                tracing::debug!(old = %old, "cache key replaced");
                Some(old)
            }
            _ => None,
        }
    }

    /// Forget the current key, returning it for release.
    #[must_use = "a dropped cache key must be released on the store"]
    pub fn release(&mut self) -> Option<CacheKey> {
        self.key.take()
    }

    pub fn choose_recompute_mode(&self, recompute: bool) -> RecomputeMode {
        match (&self.key, recompute) {
            (None, _) => RecomputeMode::ComputeAndCache,
            (Some(_), true) => RecomputeMode::FetchFromCacheAndRecompute,
            (Some(_), false) => RecomputeMode::FetchFromCache,
        }
    }
}
