use crate::api::{Bounds, GenerationRequest};
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Default upper limit for files accepted by the file check (100 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Data source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub cache_count: usize,
    pub row_count: usize,
    pub column_count: usize,
    pub bounds: Bounds,
    pub lod_enabled: bool,
    /// Overrides the worker pool size when set.
    pub worker_threads: Option<usize>,
    /// Fixed seed for the random jitter. `None` seeds from entropy.
    pub seed: Option<u64>,
    pub max_file_size: u64,
    /// How often the viewer advances to the next grid.
    pub refresh_hz: f32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            cache_count: 24,
            row_count: 150,
            column_count: 300,
            bounds: Bounds::default(),
            lod_enabled: true,
            worker_threads: None,
            seed: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            refresh_hz: 30.0,
        }
    }
}

impl GeneratorConfig {
    pub fn from_ron(text: &str) -> Result<Self, EngineError> {
        Ok(ron::from_str(text)?)
    }

    /// Loads a RON config file. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    pub fn request(&self) -> GenerationRequest {
        GenerationRequest::new(self.cache_count, self.row_count, self.column_count, self.bounds)
    }

    /// `max(4, availableParallelism - 1)` unless overridden.
    pub fn pool_size(&self) -> usize {
        if let Some(threads) = self.worker_threads {
            return threads.max(1);
        }
        let available = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        available.saturating_sub(1).max(4)
    }
}
