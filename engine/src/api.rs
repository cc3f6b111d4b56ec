use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// A single surface sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3D {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Coordinate bounds of a generated surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub z_min: f64,
    pub z_max: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self { x_min: -8.0, x_max: 8.0, y_min: -8.0, y_max: 8.0, z_min: -8.0, z_max: 8.0 }
    }
}

impl Bounds {
    pub fn x_range(&self) -> f64 { self.x_max - self.x_min }
    pub fn y_range(&self) -> f64 { self.y_max - self.y_min }
    pub fn z_range(&self) -> f64 { self.z_max - self.z_min }

    pub fn is_finite(&self) -> bool {
        [self.x_min, self.x_max, self.y_min, self.y_max, self.z_min, self.z_max]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// The rectangular region one synthesis call covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridRegion {
    pub row_start: usize,
    pub row_count: usize,
    pub column_count: usize,
    pub bounds: Bounds,
}

impl GridRegion {
    pub fn new(row_count: usize, column_count: usize, bounds: Bounds) -> Self {
        Self { row_start: 0, row_count, column_count, bounds }
    }

    pub fn cell_count(&self) -> usize {
        self.row_count.saturating_mul(self.column_count)
    }
}

/// One surface frame. Points are stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    row_count: usize,
    column_count: usize,
    points: Vec<Point3D>,
}

impl Grid {
    /// Returns `None` when `points` does not fill `row_count * column_count`.
    pub fn from_points(row_count: usize, column_count: usize, points: Vec<Point3D>) -> Option<Self> {
        (row_count.checked_mul(column_count) == Some(points.len())).then_some(Self { row_count, column_count, points })
    }

    /// For producers that fill every cell by construction.
    pub(crate) fn from_filled(row_count: usize, column_count: usize, points: Vec<Point3D>) -> Self {
        debug_assert_eq!(row_count.checked_mul(column_count), Some(points.len()));
        Self { row_count, column_count, points }
    }

    pub fn row_count(&self) -> usize { self.row_count }
    pub fn column_count(&self) -> usize { self.column_count }
    pub fn points(&self) -> &[Point3D] { &self.points }

    #[inline]
    fn index(&self, row: usize, column: usize) -> usize {
        row * self.column_count + column
    }

    pub fn get(&self, row: usize, column: usize) -> Option<Point3D> {
        if row < self.row_count && column < self.column_count {
            Some(self.points[self.index(row, column)])
        } else {
            None
        }
    }

    pub fn row(&self, row: usize) -> Option<&[Point3D]> {
        if row >= self.row_count {
            return None;
        }
        let start = self.index(row, 0);
        Some(&self.points[start..start + self.column_count])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Point3D]> {
        // chunks() rejects a zero size
        self.points.chunks(self.column_count.max(1)).take(self.row_count)
    }

    /// Copies the grid out as nested rows, the shape a rendering sink ingests.
    pub fn to_rows(&self) -> Vec<Vec<Point3D>> {
        self.rows().map(|r| r.to_vec()).collect()
    }
}

/// A completed set of grids produced by one generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    grids: Vec<Arc<Grid>>,
}

impl Batch {
    pub fn new(grids: Vec<Arc<Grid>>) -> Self {
        Self { grids }
    }

    pub fn len(&self) -> usize { self.grids.len() }
    pub fn is_empty(&self) -> bool { self.grids.is_empty() }
    pub fn get(&self, index: usize) -> Option<&Arc<Grid>> { self.grids.get(index) }
    pub fn grids(&self) -> &[Arc<Grid>] { &self.grids }
}

/// A generation request as issued by the UI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationRequest {
    pub cache_count: usize,
    pub row_count: usize,
    pub column_count: usize,
    pub bounds: Bounds,
}

impl GenerationRequest {
    pub fn new(cache_count: usize, row_count: usize, column_count: usize, bounds: Bounds) -> Self {
        Self { cache_count, row_count, column_count, bounds }
    }

    /// Zero counts, a cell count that overflows `usize`, or non-finite
    /// bounds make a request a no-op.
    pub fn is_valid(&self) -> bool {
        self.cache_count > 0
            && self.row_count > 0
            && self.column_count > 0
            && self.row_count.checked_mul(self.column_count).is_some()
            && self.bounds.is_finite()
    }
}

/// Notifications the data source publishes to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum DataEvent {
    FileError(String),
    FileAccepted(PathBuf),
    DataProgress(u8),
    DataReady,
}

/// Produces one grid for a region. `seed` drives the random jitter.
pub trait SurfaceSynthesizer: Send + Sync {
    fn synthesize(&self, region: &GridRegion, seed: u64) -> Grid;
}

/// Rendering-side ingestion point for a selected grid.
pub trait SurfaceSink {
    fn reset_array(&mut self, rows: Vec<Vec<Point3D>>);
}
