//! Memory-aware cache bookkeeping for decoded media payloads.
//!
//! The cache never owns content; payloads live inside their `MediaFile`. It
//! only keeps the time order of entities currently holding content, oldest at
//! the head, and decides which of them release their payload when available
//! process memory runs low.

use std::collections::VecDeque;

use crate::core::media_file::MediaFile;

/// Supplies the current available-memory estimate in bytes.
pub type MemoryProbe = Box<dyn Fn() -> u64 + Send + Sync>;

fn system_available_memory() -> u64 {
    let mut system = sysinfo::System::new();
    system.refresh_memory();
    system.available_memory()
}

/// Oldest-first eviction ledger keyed by entity id (paths mutate under rename).
pub struct ContentCache {
    order: VecDeque<u64>,
    headroom_bytes: u64,
    probe: MemoryProbe,
}

impl ContentCache {
    /// Creates a cache that evicts until the process has at least
    /// `headroom_mb` megabytes of available memory, measured via `sysinfo`.
    pub fn new(headroom_mb: u64) -> Self {
        Self::with_probe(headroom_mb, Box::new(system_available_memory))
    }

    /// Creates a cache with an injected memory probe. Tests use this to force
    /// deterministic pressure.
    pub fn with_probe(headroom_mb: u64, probe: MemoryProbe) -> Self {
        Self {
            order: VecDeque::new(),
            headroom_bytes: headroom_mb * 1024 * 1024,
            probe,
        }
    }

    /// Registers an entity as the most recently used member. Re-touching an
    /// entity renews its position without duplicating it.
    pub fn add_as_latest(&mut self, id: u64) {
        self.order.retain(|&member| member != id);
        self.order.push_back(id);
    }

    /// Evicts oldest members until the available-memory estimate plus the
    /// memory the evictions would have freed reaches the headroom target.
    ///
    /// Releasing a payload does not synchronously lower measured memory, so
    /// the freed amount is carried as a running estimate instead of
    /// re-measuring after each eviction. Documented heuristic, not an exact
    /// account.
    pub fn maintain_cache_size_by_flushing_oldest(&mut self, files: &mut [MediaFile]) {
        let mut freed: u64 = 0;
        while (self.probe)() + freed < self.headroom_bytes {
            let Some(id) = self.order.pop_front() else {
                break;
            };
            if let Some(file) = files.iter_mut().find(|f| f.id() == id) {
                freed += file.content_size();
                tracing::debug!(
                    "Evicting cached content of {} ({} bytes)",
                    file.path().display(),
                    file.content_size()
                );
                file.release_content();
            }
        }
    }

    /// Removes one entity unconditionally, e.g. because its file changed
    /// externally. The entity itself releases its payload separately.
    pub fn flush(&mut self, id: u64) {
        self.order.retain(|&member| member != id);
    }

    /// Releases every member's content and clears the ledger.
    pub fn flush_all(&mut self, files: &mut [MediaFile]) {
        for &id in &self.order {
            if let Some(file) = files.iter_mut().find(|f| f.id() == id) {
                file.release_content();
            }
        }
        self.order.clear();
    }

    pub fn contains(&self, id: u64) -> bool {
        self.order.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
