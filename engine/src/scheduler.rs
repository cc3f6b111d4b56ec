use crate::api::{Grid, GridRegion, SurfaceSynthesizer};
use crate::cache::{CacheStore, Signature};
use crate::error::EngineError;
use crate::sampling::SeedSource;
use crossbeam::channel::Sender;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, info};

/// One grid of a batch, as handed to a worker.
#[derive(Debug, Clone, Copy)]
pub struct GridTask {
    /// Identifies the request this task belongs to.
    pub generation: u64,
    pub index: usize,
    pub region: GridRegion,
    pub seed: u64,
}

/// What a worker sends back to the data source.
#[derive(Debug, Clone)]
pub struct WorkerResult {
    pub generation: u64,
    pub index: usize,
    pub grid: Arc<Grid>,
    pub from_cache: bool,
}

/// How a batch is spread over the pool: `threads` workers, each submitting a
/// contiguous run of `chunk_size` grid indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkPlan {
    pub cache_count: usize,
    pub threads: usize,
    pub chunk_size: usize,
}

impl WorkPlan {
    pub fn new(pool_size: usize, cache_count: usize) -> Self {
        let threads = pool_size.min(cache_count).max(1);
        let chunk_size = (cache_count / threads).max(1);
        Self { cache_count, threads, chunk_size }
    }

    pub fn chunks(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.cache_count)
            .step_by(self.chunk_size)
            .map(move |start| start..(start + self.chunk_size).min(self.cache_count))
    }
}

/// Checks the cache for the task's grid, synthesizing and storing it on a miss.
pub fn run_task(task: &GridTask, synthesizer: &dyn SurfaceSynthesizer, cache: &CacheStore) -> WorkerResult {
    let signature = Signature::grid(&task.region, task.index);
    if let Some(grid) = cache.get_grid(&signature) {
        return WorkerResult { generation: task.generation, index: task.index, grid, from_cache: true };
    }

    let grid = Arc::new(synthesizer.synthesize(&task.region, task.seed));
    cache.put_grid(signature, grid.clone());
    WorkerResult { generation: task.generation, index: task.index, grid, from_cache: false }
}

/// Fixed-size generation pool. Completed grids go out over `results`.
pub struct WorkerScheduler {
    pool: ThreadPool,
    thread_count: usize,
    synthesizer: Arc<dyn SurfaceSynthesizer>,
    cache: Arc<CacheStore>,
    results: Sender<WorkerResult>,
}

impl WorkerScheduler {
    pub fn new(
        thread_count: usize,
        synthesizer: Arc<dyn SurfaceSynthesizer>,
        cache: Arc<CacheStore>,
        results: Sender<WorkerResult>,
    ) -> Result<Self, EngineError> {
        let thread_count = thread_count.max(1);
        info!("Creating surface generation thread pool with {} threads", thread_count);
        let pool = ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .thread_name(|i| format!("surface_generation_{i}"))
            .build()?;
        Ok(Self { pool, thread_count, synthesizer, cache, results })
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Submits one task per grid index. Seeds are drawn here, in index order,
    /// so a seeded source gives the same batch however the pool interleaves.
    pub fn dispatch(&self, generation: u64, region: GridRegion, cache_count: usize, seeds: &SeedSource) -> WorkPlan {
        let plan = WorkPlan::new(self.thread_count, cache_count);
        debug!(
            "Dispatching {} grids of {}x{} over {} threads, {} per chunk",
            cache_count, region.row_count, region.column_count, plan.threads, plan.chunk_size
        );

        for chunk in plan.chunks() {
            for index in chunk {
                let task = GridTask { generation, index, region, seed: seeds.next_seed() };
                let synthesizer = self.synthesizer.clone();
                let cache = self.cache.clone();
                let results = self.results.clone();
                self.pool.spawn(move || {
                    let result = run_task(&task, synthesizer.as_ref(), &cache);
                    if results.send(result).is_err() {
                        debug!("Data source dropped, grid {} discarded", task.index);
                    }
                });
            }
        }
        plan
    }
}
