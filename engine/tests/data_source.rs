use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use surface_engine::*;

const WAIT: Duration = Duration::from_secs(30);

/// Wraps the real synthesizer and counts calls.
#[derive(Default)]
struct CountingSynthesizer {
    calls: AtomicUsize,
}

impl CountingSynthesizer {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SurfaceSynthesizer for CountingSynthesizer {
    fn synthesize(&self, region: &GridRegion, seed: u64) -> Grid {
        self.calls.fetch_add(1, Ordering::SeqCst);
        WaveSynthesizer.synthesize(region, seed)
    }
}

#[derive(Default)]
struct RecordingSink {
    frames: Vec<Vec<Vec<Point3D>>>,
}

impl SurfaceSink for RecordingSink {
    fn reset_array(&mut self, rows: Vec<Vec<Point3D>>) {
        self.frames.push(rows);
    }
}

fn test_config() -> GeneratorConfig {
    GeneratorConfig { worker_threads: Some(4), seed: Some(1), ..Default::default() }
}

fn source_with_counter(cache: Arc<CacheStore>) -> (DataSource, Arc<CountingSynthesizer>) {
    let counter = Arc::new(CountingSynthesizer::default());
    let source = DataSource::with_synthesizer(&test_config(), cache, counter.clone()).unwrap();
    (source, counter)
}

fn request(cache_count: usize, rows: usize, columns: usize) -> GenerationRequest {
    GenerationRequest::new(cache_count, rows, columns, Bounds::default())
}

fn drain(source: &DataSource) -> Vec<DataEvent> {
    source.events().try_iter().collect()
}

#[test]
fn test_identical_request_hits_cache() {
    let (mut source, counter) = source_with_counter(CacheStore::shared());

    source.generate_data(request(4, 20, 30));
    assert!(source.wait_until_ready(WAIT));
    assert_eq!(counter.calls(), 4);
    let first = source.ready_batch().unwrap();
    drain(&source);

    source.generate_data(request(4, 20, 30));
    assert!(source.is_ready());
    assert_eq!(counter.calls(), 4);
    let second = source.ready_batch().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(drain(&source), vec![DataEvent::DataProgress(100), DataEvent::DataReady]);
}

#[test]
fn test_clear_cache_forces_regeneration() {
    let (mut source, counter) = source_with_counter(CacheStore::shared());

    source.generate_data(request(3, 10, 10));
    assert!(source.wait_until_ready(WAIT));
    assert_eq!(counter.calls(), 3);

    source.clear_cache();
    assert!(source.cache().is_empty());

    source.generate_data(request(3, 10, 10));
    assert!(source.wait_until_ready(WAIT));
    assert_eq!(counter.calls(), 6);
}

#[test]
fn test_cache_is_shared_between_sources() {
    let cache = CacheStore::shared();
    let (mut first, first_counter) = source_with_counter(cache.clone());
    let (mut second, second_counter) = source_with_counter(cache);

    first.generate_data(request(2, 8, 8));
    assert!(first.wait_until_ready(WAIT));
    second.generate_data(request(2, 8, 8));
    assert!(second.wait_until_ready(WAIT));

    assert_eq!(first_counter.calls(), 2);
    assert_eq!(second_counter.calls(), 0);
}

#[test]
fn test_lod_reduces_large_request() {
    let (mut source, _) = source_with_counter(CacheStore::shared());

    source.generate_data(request(2, 200, 200));
    assert!(source.wait_until_ready(WAIT));
    let batch = source.ready_batch().unwrap();
    assert!(batch.grids().iter().all(|g| g.row_count() == 100 && g.column_count() == 100));
}

#[test]
fn test_lod_skipped_when_reduction_too_small() {
    let (mut source, _) = source_with_counter(CacheStore::shared());

    source.generate_data(request(1, 110, 90));
    assert!(source.wait_until_ready(WAIT));
    let grid = source.ready_batch().unwrap().get(0).unwrap().clone();
    assert_eq!((grid.row_count(), grid.column_count()), (110, 90));
}

#[test]
fn test_lod_toggle_applies_to_next_request() {
    let (mut source, _) = source_with_counter(CacheStore::shared());
    source.set_lod_enabled(false);
    assert!(!source.lod_enabled());

    source.generate_data(request(1, 150, 150));
    assert!(source.wait_until_ready(WAIT));
    assert_eq!(source.ready_batch().unwrap().get(0).unwrap().row_count(), 150);
}

#[test]
fn test_lod_toggle_bypasses_reduced_cached_batch() {
    let (mut source, counter) = source_with_counter(CacheStore::shared());

    source.generate_data(request(2, 200, 200));
    assert!(source.wait_until_ready(WAIT));
    let grid = source.ready_batch().unwrap().get(0).unwrap().clone();
    assert_eq!((grid.row_count(), grid.column_count()), (100, 100));
    assert_eq!(counter.calls(), 2);

    source.set_lod_enabled(false);
    source.generate_data(request(2, 200, 200));
    assert!(source.wait_until_ready(WAIT));
    let batch = source.ready_batch().unwrap();
    assert!(batch.grids().iter().all(|g| g.row_count() == 200 && g.column_count() == 200));
    assert_eq!(counter.calls(), 4);

    // both sizes stay cached
    source.set_lod_enabled(true);
    source.generate_data(request(2, 200, 200));
    assert!(source.is_ready());
    assert_eq!(source.ready_batch().unwrap().get(0).unwrap().row_count(), 100);
    assert_eq!(counter.calls(), 4);
}

#[test]
fn test_progress_and_single_ready() {
    let (mut source, _) = source_with_counter(CacheStore::shared());

    source.generate_data(request(5, 16, 16));
    assert!(source.wait_until_ready(WAIT));
    source.poll();

    let events = drain(&source);
    let progress: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            DataEvent::DataProgress(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(progress.len(), 5);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(progress.last(), Some(&100));
    assert_eq!(events.iter().filter(|e| **e == DataEvent::DataReady).count(), 1);
    assert_eq!(events.last(), Some(&DataEvent::DataReady));
    assert_eq!(source.state(), BatchState::Ready);
}

#[test]
fn test_update_cycles_with_wraparound() {
    let (mut source, _) = source_with_counter(CacheStore::shared());
    let mut sink = RecordingSink::default();

    assert_eq!(source.update(&mut sink), None);
    assert!(sink.frames.is_empty());

    source.generate_data(request(3, 4, 6));
    assert!(source.wait_until_ready(WAIT));

    let indices: Vec<usize> = (0..5).filter_map(|_| source.update(&mut sink)).collect();
    assert_eq!(indices, vec![0, 1, 2, 0, 1]);
    assert_eq!(sink.frames.len(), 5);
    assert!(sink.frames.iter().all(|f| f.len() == 4 && f.iter().all(|r| r.len() == 6)));

    let batch = source.ready_batch().unwrap();
    assert_eq!(sink.frames[3], batch.get(0).unwrap().to_rows());
}

#[test]
fn test_invalid_request_is_silent_noop() {
    let (mut source, counter) = source_with_counter(CacheStore::shared());

    source.generate_data(request(0, 10, 10));
    source.generate_data(request(3, 0, 10));
    source.generate_data(request(3, 10, 0));

    assert_eq!(source.poll(), 0);
    assert_eq!(counter.calls(), 0);
    assert_eq!(source.state(), BatchState::Empty);
    assert!(drain(&source).is_empty());
}

#[test]
fn test_superseded_request_results_are_discarded() {
    let (mut source, _) = source_with_counter(CacheStore::shared());

    source.generate_data(request(8, 12, 12));
    source.generate_data(request(8, 3, 4));
    assert!(source.wait_until_ready(WAIT));

    let batch = source.ready_batch().unwrap();
    assert_eq!(batch.len(), 8);
    assert!(batch.grids().iter().all(|g| g.row_count() == 3 && g.column_count() == 4));
    let ready_events = drain(&source).into_iter().filter(|e| *e == DataEvent::DataReady).count();
    assert_eq!(ready_events, 1);
}

#[test]
fn test_clear_data_drops_ready_batch() {
    let (mut source, _) = source_with_counter(CacheStore::shared());
    source.generate_data(request(2, 5, 5));
    assert!(source.wait_until_ready(WAIT));

    source.clear_data();
    assert!(!source.is_ready());
    assert_eq!(source.state(), BatchState::Empty);
    assert!(source.select_next().is_none());
}

#[test]
fn test_seeded_sources_generate_identical_batches() {
    let (mut a, _) = source_with_counter(CacheStore::shared());
    let (mut b, _) = source_with_counter(CacheStore::shared());

    a.generate_data(request(4, 10, 12));
    b.generate_data(request(4, 10, 12));
    assert!(a.wait_until_ready(WAIT));
    assert!(b.wait_until_ready(WAIT));

    let (a, b) = (a.ready_batch().unwrap(), b.ready_batch().unwrap());
    for (ga, gb) in a.grids().iter().zip(b.grids()) {
        assert_eq!(ga.as_ref(), gb.as_ref());
    }
}

#[test]
fn test_file_check_notifications() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("heightmap.png");
    std::fs::write(&path, [1u8; 16]).unwrap();

    let (source, _) = source_with_counter(CacheStore::shared());
    let url = format!("file://{}", path.display());
    assert_eq!(source.check_and_process_file(&url).unwrap(), path);
    assert!(source.check_and_process_file(&format!("{}.missing", path.display())).is_err());

    let events = drain(&source);
    assert_eq!(events[0], DataEvent::FileAccepted(path.clone()));
    assert!(matches!(&events[1], DataEvent::FileError(msg) if msg.starts_with("File not found")));
}
