//! Records which cache partitions are stale. There is no cached content here;
//! readers consult the stale set and clear an entry once they have rebuilt it.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use domains::{CacheInvalidator, Partition, StaleEntry};
use tracing::debug;

#[derive(Debug, Default)]
pub struct MemoryCache {
    stale: DashMap<Partition, DateTime<Utc>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stale(&self, partition: &Partition) -> bool {
        self.stale.contains_key(partition)
    }
}

impl CacheInvalidator for MemoryCache {
    fn invalidate(&self, partitions: &[Partition]) {
        let now = Utc::now();
        for partition in partitions {
            debug!(%partition, "partition marked stale");
            self.stale.insert(partition.clone(), now);
        }
    }

    fn stale(&self) -> Vec<StaleEntry> {
        let mut entries: Vec<StaleEntry> = self
            .stale
            .iter()
            .map(|entry| StaleEntry {
                partition: entry.key().clone(),
                invalidated_at: *entry.value(),
            })
            .collect();
        entries.sort_by(|a, b| {
            a.invalidated_at
                .cmp(&b.invalidated_at)
                .then_with(|| a.partition.cmp(&b.partition))
        });
        entries
    }

    fn clear(&self, partition: &Partition) -> bool {
        self.stale.remove(partition).is_some()
    }
}
