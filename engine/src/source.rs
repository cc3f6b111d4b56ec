use crate::aggregator::{BatchAggregator, BatchState, Completion};
use crate::api::*;
use crate::cache::{CacheStore, Signature};
use crate::config::GeneratorConfig;
use crate::error::{EngineError, FileCheckError};
use crate::files;
use crate::lod::LodPolicy;
use crate::sampling::{SeedSource, WaveSynthesizer};
use crate::scheduler::{WorkerResult, WorkerScheduler};
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Entry point the UI talks to. Owns the current batch and turns worker
/// results into `DataEvent`s on the control thread (see `poll`).
pub struct DataSource {
    cache: Arc<CacheStore>,
    scheduler: WorkerScheduler,
    results: Receiver<WorkerResult>,
    aggregator: BatchAggregator,
    seeds: SeedSource,
    lod: LodPolicy,
    generation: u64,
    /// Batch signature of the request being filled.
    pending: Option<Signature>,
    ready: Option<Arc<Batch>>,
    read_index: Option<usize>,
    events_tx: Sender<DataEvent>,
    events_rx: Receiver<DataEvent>,
    max_file_size: u64,
    started: Option<Instant>,
}

impl DataSource {
    pub fn new(config: &GeneratorConfig, cache: Arc<CacheStore>) -> Result<Self, EngineError> {
        Self::with_synthesizer(config, cache, Arc::new(WaveSynthesizer::new()))
    }

    pub fn with_synthesizer(
        config: &GeneratorConfig,
        cache: Arc<CacheStore>,
        synthesizer: Arc<dyn SurfaceSynthesizer>,
    ) -> Result<Self, EngineError> {
        let (results_tx, results) = unbounded();
        let scheduler = WorkerScheduler::new(config.pool_size(), synthesizer, cache.clone(), results_tx)?;
        let (events_tx, events_rx) = unbounded();
        Ok(Self {
            cache,
            scheduler,
            results,
            aggregator: BatchAggregator::new(),
            seeds: SeedSource::new(config.seed),
            lod: LodPolicy::with_enabled(config.lod_enabled),
            generation: 0,
            pending: None,
            ready: None,
            read_index: None,
            events_tx,
            events_rx,
            max_file_size: config.max_file_size,
            started: None,
        })
    }

    /// Receiving end of the notification stream. Every clone sees each event
    /// at most once, so a single consumer is expected.
    pub fn events(&self) -> Receiver<DataEvent> {
        self.events_rx.clone()
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn thread_count(&self) -> usize {
        self.scheduler.thread_count()
    }

    pub fn state(&self) -> BatchState {
        self.aggregator.state()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_some()
    }

    pub fn progress(&self) -> u8 {
        self.aggregator.progress()
    }

    pub fn ready_batch(&self) -> Option<Arc<Batch>> {
        self.ready.clone()
    }

    pub fn lod_enabled(&self) -> bool {
        self.lod.enabled
    }

    /// Takes effect on the next `generate_data`.
    pub fn set_lod_enabled(&mut self, enabled: bool) {
        self.lod.enabled = enabled;
    }

    fn emit(&self, event: DataEvent) {
        // events_rx is owned by self, so the channel stays open
        let _ = self.events_tx.send(event);
    }

    /// Starts generating a batch. Results arrive through `poll`; invalid
    /// requests are ignored without notification.
    pub fn generate_data(&mut self, request: GenerationRequest) {
        if !request.is_valid() {
            debug!("Ignoring generation request {:?}", request);
            return;
        }

        self.clear_data();
        self.started = Some(Instant::now());

        let (row_count, column_count) = match self.lod.reduce(request.row_count, request.column_count) {
            Some((rows, columns)) => {
                info!(
                    "Applying level of detail: {}x{} -> {}x{}",
                    request.row_count, request.column_count, rows, columns
                );
                (rows, columns)
            }
            None => (request.row_count, request.column_count),
        };
        let region = GridRegion::new(row_count, column_count, request.bounds);

        let signature = Signature::batch(&region, request.cache_count);
        if let Some(batch) = self.cache.get_batch(&signature) {
            info!("Using cached dataset");
            self.aggregator.adopt(self.generation, &batch);
            self.ready = Some(batch);
            self.emit(DataEvent::DataProgress(100));
            self.emit(DataEvent::DataReady);
            return;
        }

        self.aggregator.reset(self.generation, request.cache_count);
        self.pending = Some(signature);

        self.scheduler.dispatch(self.generation, region, request.cache_count, &self.seeds);
    }

    /// Drains finished grids from the workers. Returns how many results
    /// were handled, stale ones included.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(result) = self.results.try_recv() {
            self.handle_result(result);
            handled += 1;
        }
        handled
    }

    /// Blocks until the current batch is ready or `timeout` passes.
    pub fn wait_until_ready(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.poll();
            if self.is_ready() {
                return true;
            }
            if self.aggregator.state() != BatchState::Filling {
                return false;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.results.recv_timeout(remaining) {
                Ok(result) => self.handle_result(result),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => return self.is_ready(),
            }
        }
    }

    fn handle_result(&mut self, result: WorkerResult) {
        match self.aggregator.accept(result.generation, result.index, result.grid) {
            Completion::Stale => {
                debug!("Discarding grid {} from superseded request {}", result.index, result.generation);
            }
            Completion::Ignored => {
                debug!("Ignoring repeated result for grid {}", result.index);
            }
            Completion::Progress(progress) => self.emit(DataEvent::DataProgress(progress)),
            Completion::Ready { progress, batch } => {
                self.emit(DataEvent::DataProgress(progress));
                if let Some(signature) = self.pending.take() {
                    self.cache.put_batch(signature, batch.clone());
                }
                let elapsed = self.started.map(|t| t.elapsed()).unwrap_or_default();
                info!("Generated {} grids in {:.1?}", batch.len(), elapsed);
                self.ready = Some(batch);
                self.emit(DataEvent::DataReady);
            }
        }
    }

    /// Advances the read index through the ready batch, wrapping around.
    pub fn select_next(&mut self) -> Option<(usize, Arc<Grid>)> {
        let batch = self.ready.as_ref()?;
        if batch.is_empty() {
            return None;
        }
        let index = match self.read_index {
            Some(i) if i + 1 < batch.len() => i + 1,
            _ => 0,
        };
        self.read_index = Some(index);
        batch.get(index).map(|grid| (index, grid.clone()))
    }

    /// Copies the next grid into `sink`. Returns the grid index, or `None`
    /// while no batch is ready.
    pub fn update<S: SurfaceSink + ?Sized>(&mut self, sink: &mut S) -> Option<usize> {
        let (index, grid) = self.select_next()?;
        sink.reset_array(grid.to_rows());
        Some(index)
    }

    /// Drops the current batch. Results still in flight are discarded when
    /// they arrive.
    pub fn clear_data(&mut self) {
        self.generation += 1;
        self.aggregator.clear(self.generation);
        self.pending = None;
        self.ready = None;
        self.read_index = None;
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Validates a file picked in the UI and reports the outcome as
    /// `FileAccepted` or `FileError`.
    pub fn check_and_process_file(&self, url: &str) -> Result<PathBuf, FileCheckError> {
        let outcome = files::check_file(url, self.max_file_size);
        match &outcome {
            Ok(path) => self.emit(DataEvent::FileAccepted(path.clone())),
            Err(e) => self.emit(DataEvent::FileError(e.to_string())),
        }
        outcome
    }
}
