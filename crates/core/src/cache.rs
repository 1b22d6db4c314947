use crate::error::SearchError;
use crate::models::{SearchFilters, SearchHit};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub query: String,
    pub filters: SearchFilters,
}

impl CacheKey {
    pub fn new(query: impl Into<String>, filters: SearchFilters) -> Self {
        Self {
            query: query.into(),
            filters,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    Disabled,
}

type Slot = Arc<Mutex<Option<Arc<Vec<SearchHit>>>>>;

/// Bounded LRU map from [`CacheKey`] to a finished result list.
///
/// Each key owns a slot with its own lock, so concurrent callers asking for
/// the same key wait for a single computation instead of repeating it.
/// Callers with different keys only contend on the map lock.
pub struct ResultCache {
    slots: Option<Mutex<LruCache<CacheKey, Slot>>>,
}

impl ResultCache {
    /// A capacity of zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: NonZeroUsize::new(capacity).map(|capacity| Mutex::new(LruCache::new(capacity))),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.slots.is_some()
    }

    pub fn get_or_compute<F>(
        &self,
        key: CacheKey,
        compute: F,
    ) -> Result<(Arc<Vec<SearchHit>>, CacheStatus), SearchError>
    where
        F: FnOnce() -> Result<Vec<SearchHit>, SearchError>,
    {
        let Some(slots) = &self.slots else {
            return compute().map(|hits| (Arc::new(hits), CacheStatus::Disabled));
        };

        let slot = {
            let mut slots = slots.lock();
            match slots.get(&key) {
                Some(slot) => Arc::clone(slot),
                None => {
                    let slot = Slot::default();
                    slots.put(key.clone(), Arc::clone(&slot));
                    slot
                }
            }
        };

        let mut entry = slot.lock();
        if let Some(hits) = entry.as_ref() {
            return Ok((Arc::clone(hits), CacheStatus::Hit));
        }

        let hits = match compute() {
            Ok(hits) => Arc::new(hits),
            Err(error) => {
                let mut slots = slots.lock();
                if slots.peek(&key).is_some_and(|current| Arc::ptr_eq(current, &slot)) {
                    slots.pop(&key);
                }
                return Err(error);
            }
        };
        *entry = Some(Arc::clone(&hits));
        Ok((hits, CacheStatus::Miss))
    }

    pub fn len(&self) -> usize {
        let Some(slots) = &self.slots else {
            return 0;
        };
        let slots = slots.lock();
        slots
            .iter()
            .filter(|(_, slot)| slot.try_lock().is_some_and(|entry| entry.is_some()))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ResultCache")
            .field("enabled", &self.is_enabled())
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, SearchType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn hits(name: &str) -> Vec<SearchHit> {
        let document = Document {
            name: name.to_string(),
            ..Document::default()
        };
        vec![SearchHit::new(&document, 80, SearchType::Tfidf)]
    }

    fn key(query: &str) -> CacheKey {
        CacheKey::new(query, SearchFilters::default())
    }

    #[test]
    fn second_lookup_is_a_hit() -> Result<(), SearchError> {
        let cache = ResultCache::new(4);
        let (first, status) = cache.get_or_compute(key("fever"), || Ok(hits("Crocin")))?;
        assert_eq!(status, CacheStatus::Miss);

        let (second, status) =
            cache.get_or_compute(key("fever"), || Ok(hits("should not run")))?;
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        Ok(())
    }

    #[test]
    fn filters_are_part_of_the_key() -> Result<(), SearchError> {
        let cache = ResultCache::new(4);
        cache.get_or_compute(key("fever"), || Ok(hits("Crocin")))?;

        let filtered = CacheKey::new(
            "fever",
            SearchFilters {
                manufacturer: Some("GSK".to_string()),
                ..SearchFilters::default()
            },
        );
        let (_, status) = cache.get_or_compute(filtered, || Ok(Vec::new()))?;
        assert_eq!(status, CacheStatus::Miss);
        assert_eq!(cache.len(), 2);
        Ok(())
    }

    #[test]
    fn zero_capacity_disables_caching() -> Result<(), SearchError> {
        let cache = ResultCache::new(0);
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let (_, status) = cache.get_or_compute(key("fever"), || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(hits("Crocin"))
            })?;
            assert_eq!(status, CacheStatus::Disabled);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(cache.is_empty());
        Ok(())
    }

    #[test]
    fn failed_computations_are_not_cached() -> Result<(), SearchError> {
        let cache = ResultCache::new(4);
        let failed = cache.get_or_compute(key("fever"), || {
            Err(SearchError::NotReady("vector index".to_string()))
        });
        assert!(failed.is_err());
        assert!(cache.is_empty());

        let (_, status) = cache.get_or_compute(key("fever"), || Ok(hits("Crocin")))?;
        assert_eq!(status, CacheStatus::Miss);
        Ok(())
    }

    #[test]
    fn failed_computation_does_not_take_capacity() -> Result<(), SearchError> {
        let cache = ResultCache::new(2);
        cache.get_or_compute(key("a"), || Ok(hits("A")))?;
        let failed = cache.get_or_compute(key("c"), || {
            Err(SearchError::NotReady("vector index".to_string()))
        });
        assert!(failed.is_err());
        cache.get_or_compute(key("b"), || Ok(hits("B")))?;

        let (_, status) = cache.get_or_compute(key("a"), || Ok(hits("A")))?;
        assert_eq!(status, CacheStatus::Hit);
        let (_, status) = cache.get_or_compute(key("b"), || Ok(hits("B")))?;
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(cache.len(), 2);
        Ok(())
    }

    #[test]
    fn least_recently_used_key_is_evicted() -> Result<(), SearchError> {
        let cache = ResultCache::new(2);
        cache.get_or_compute(key("a"), || Ok(hits("A")))?;
        cache.get_or_compute(key("b"), || Ok(hits("B")))?;
        cache.get_or_compute(key("a"), || Ok(hits("A")))?;
        cache.get_or_compute(key("c"), || Ok(hits("C")))?;

        let (_, status) = cache.get_or_compute(key("a"), || Ok(hits("A")))?;
        assert_eq!(status, CacheStatus::Hit);
        let (_, status) = cache.get_or_compute(key("b"), || Ok(hits("B")))?;
        assert_eq!(status, CacheStatus::Miss);
        Ok(())
    }

    #[test]
    fn concurrent_callers_compute_once() {
        let cache = ResultCache::new(8);
        let calls = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let outcome = cache.get_or_compute(key("headache"), || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(20));
                        Ok(hits("Dolo 650"))
                    });
                    assert!(outcome.is_ok());
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }
}
