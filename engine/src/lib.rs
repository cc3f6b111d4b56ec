//! Synthetic surface data for the surface gallery: a worker pool that
//! generates batches of height-map grids, caches them and reports progress.

pub mod aggregator;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod files;
pub mod lod;
pub mod sampling;
pub mod scheduler;
pub mod source;

pub use aggregator::{BatchAggregator, BatchState, Completion};
pub use api::*;
pub use cache::{CacheEntry, CacheStats, CacheStore, Signature};
pub use config::GeneratorConfig;
pub use error::{EngineError, FileCheckError};
pub use lod::LodPolicy;
pub use sampling::{SeedSource, WaveSynthesizer};
pub use scheduler::{WorkPlan, WorkerScheduler};
pub use source::DataSource;
