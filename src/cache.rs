use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::action::ActionId;

/// A memory cache of raw annotation tags keyed by action.
///
/// Entries never expire. The lock only guards the map: the value is computed
/// without holding it, so two requests missing the same key may both compute
/// it, and the later insert wins.
#[derive(Debug, Default)]
pub struct TagCache {
    tags: Mutex<HashMap<ActionId, String>>,
}

impl TagCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached tag for `id`, computing it on a miss. Empty tags are
    /// returned but not stored, so an action without annotation is probed again
    /// next time.
    pub fn get_or_compute<F>(&self, id: &ActionId, compute: F) -> String
    where
        F: FnOnce() -> String,
    {
        if let Some(tag) = self.lock().get(id) {
            return tag.clone();
        }

        let tag = compute();
        if !tag.is_empty() {
            self.lock().insert(*id, tag.clone());
        }
        tag
    }

    pub fn get(&self, id: &ActionId) -> Option<String> {
        self.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // The map holds plain strings, a panic elsewhere cannot leave it half written.
    fn lock(&self) -> MutexGuard<'_, HashMap<ActionId, String>> {
        self.tags.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
