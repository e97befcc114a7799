// Import necessary crates and modules
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::error::GradingError;
use crate::gemini::GeminiClient;

/// Source of assignment insights.
///
/// Implemented by [`GeminiClient`] using its fast insight model; tests
/// substitute counting stubs to observe cache behavior.
pub trait InsightBackend: Send + Sync {
    fn fetch_insight(
        &self,
        title: &str,
        description: &str,
    ) -> impl Future<Output = Result<String, GradingError>> + Send;
}

impl InsightBackend for GeminiClient {
    async fn fetch_insight(
        &self,
        title: &str,
        description: &str,
    ) -> Result<String, GradingError> {
        self.fast_insight(title, description).await
    }
}

/// Cache of per-assignment insights, keyed by assignment id.
///
/// Insights are advisory: the cache returns `None` on a fetch failure rather
/// than propagating the error, so a missing insight never blocks a grading
/// view. A cached insight is served without any backend call; entries live
/// until explicitly invalidated.
pub struct InsightCache<B> {
    backend: Arc<B>,
    cache: Mutex<HashMap<String, String>>,
}

impl<B: InsightBackend> InsightCache<B> {
    pub fn new(backend: Arc<B>) -> InsightCache<B> {
        InsightCache {
            backend,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the insight for an assignment, fetching on first request.
    ///
    /// Arguments:
    /// - `assignment_id`: Cache key.
    /// - `title`, `description`: Prompt inputs for a cache miss.
    ///
    /// Returns `None` when the backend call fails; the failure is logged and
    /// nothing is cached, so a later request retries.
    pub async fn get_or_fetch(
        &self,
        assignment_id: &str,
        title: &str,
        description: &str,
    ) -> Option<String> {
        // The lock is released before the await; concurrent misses for the
        // same assignment may both fetch, and the later insert wins.
        if let Some(cached) = self.cached(assignment_id) {
            return Some(cached);
        }

        match self.backend.fetch_insight(title, description).await {
            Ok(insight) => {
                self.cache
                    .lock()
                    .unwrap()
                    .insert(assignment_id.to_string(), insight.clone());
                Some(insight)
            }
            Err(e) => {
                log::warn!("insight fetch failed for assignment {}: {}", assignment_id, e);
                None
            }
        }
    }

    /// The cached insight, if any, without fetching.
    pub fn cached(&self, assignment_id: &str) -> Option<String> {
        self.cache.lock().unwrap().get(assignment_id).cloned()
    }

    /// Drops one assignment's cached insight.
    pub fn invalidate(&self, assignment_id: &str) {
        self.cache.lock().unwrap().remove(assignment_id);
    }

    /// Drops every cached insight.
    pub fn clear(&self) {
        self.cache.lock().unwrap().clear();
    }
}
