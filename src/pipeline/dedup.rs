use std::collections::HashSet;
use std::sync::Mutex;

use tracing::debug;

use crate::config::DedupLifetime;
use crate::model::DealCandidate;

/// Keys of offers already announced. Shared across runs only when the
/// lifetime is `PerProcess`.
#[derive(Debug)]
pub struct DedupStore {
    lifetime: DedupLifetime,
    seen: Mutex<HashSet<String>>,
}

impl DedupStore {
    pub fn new(lifetime: DedupLifetime) -> Self {
        Self {
            lifetime,
            seen: Mutex::new(HashSet::new()),
        }
    }

    pub fn lifetime(&self) -> DedupLifetime {
        self.lifetime
    }

    /// Called by the runner before each run. Per-run stores start empty.
    pub fn begin_run(&self) {
        if self.lifetime == DedupLifetime::PerRun {
            self.lock().clear();
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn record<I>(&self, keys: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.lock().extend(keys);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        // A poisoned set is still a valid set of strings.
        self.seen.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Lowercased, trimmed title prefix of `key_len` characters.
pub fn dedup_key(title: &str, key_len: usize) -> String {
    let prefix: String = title.chars().take(key_len).collect();
    prefix.to_lowercase().trim().to_string()
}

/// Keep the first candidate per key, in input order, skipping keys the store
/// has already announced.
pub fn dedup(candidates: Vec<DealCandidate>, key_len: usize, store: &DedupStore) -> Vec<DealCandidate> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let key = dedup_key(&candidate.title, key_len);
        if store.contains(&key) {
            debug!(key = %key, "already announced");
            continue;
        }
        if !seen.insert(key) {
            debug!(title = %candidate.title, source = %candidate.source, "duplicate dropped");
            continue;
        }
        unique.push(candidate);
    }

    unique
}
