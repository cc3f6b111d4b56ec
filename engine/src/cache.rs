use crate::api::{Batch, Bounds, Grid, GridRegion};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Hashable form of the generation parameters shared by grid and batch keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionKey {
    pub row_start: usize,
    pub row_count: usize,
    pub column_count: usize,
    bounds: [u64; 6],
}

impl RegionKey {
    pub fn new(row_start: usize, row_count: usize, column_count: usize, bounds: &Bounds) -> Self {
        // + 0.0 folds -0.0 into 0.0 so equal bounds hash equally
        let bits = |v: f64| (v + 0.0).to_bits();
        Self {
            row_start,
            row_count,
            column_count,
            bounds: [
                bits(bounds.x_min),
                bits(bounds.x_max),
                bits(bounds.y_min),
                bits(bounds.y_max),
                bits(bounds.z_min),
                bits(bounds.z_max),
            ],
        }
    }
}

/// Canonical cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signature {
    /// One grid of a batch, keyed with its index.
    Grid { region: RegionKey, index: usize },
    /// A whole batch, keyed with the region its grids were generated for.
    Batch { region: RegionKey, cache_count: usize },
}

impl Signature {
    pub fn grid(region: &GridRegion, index: usize) -> Self {
        Signature::Grid {
            region: RegionKey::new(region.row_start, region.row_count, region.column_count, &region.bounds),
            index,
        }
    }

    /// `region` is the one after level of detail, so toggling LOD changes
    /// the key.
    pub fn batch(region: &GridRegion, cache_count: usize) -> Self {
        Signature::Batch {
            region: RegionKey::new(region.row_start, region.row_count, region.column_count, &region.bounds),
            cache_count,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CacheEntry {
    Grid(Arc<Grid>),
    Batch(Arc<Batch>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// In-memory store of generated surfaces. Shared between the data source and
/// its workers; entries live until `clear`.
#[derive(Default)]
pub struct CacheStore {
    entries: DashMap<Signature, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn get(&self, signature: &Signature) -> Option<CacheEntry> {
        let entry = self.entries.get(signature).map(|e| e.value().clone());
        let counter = if entry.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        entry
    }

    pub fn get_grid(&self, signature: &Signature) -> Option<Arc<Grid>> {
        match self.get(signature)? {
            CacheEntry::Grid(grid) => Some(grid),
            CacheEntry::Batch(_) => None,
        }
    }

    pub fn get_batch(&self, signature: &Signature) -> Option<Arc<Batch>> {
        match self.get(signature)? {
            CacheEntry::Batch(batch) => Some(batch),
            CacheEntry::Grid(_) => None,
        }
    }

    pub fn put(&self, signature: Signature, entry: CacheEntry) {
        self.entries.insert(signature, entry);
    }

    pub fn put_grid(&self, signature: Signature, grid: Arc<Grid>) {
        self.put(signature, CacheEntry::Grid(grid));
    }

    pub fn put_batch(&self, signature: Signature, batch: Arc<Batch>) {
        self.put(signature, CacheEntry::Batch(batch));
    }

    pub fn clear(&self) {
        let dropped = self.entries.len();
        self.entries.clear();
        info!("Data cache cleared ({} entries)", dropped);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}
