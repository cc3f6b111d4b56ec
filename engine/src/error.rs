use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Invalid configuration: {0}")]
    Config(#[from] ron::error::SpannedError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Reasons a file handed over by the UI is rejected.
#[derive(Debug, Error)]
pub enum FileCheckError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("File too large (max size is {})", format_size(.max_bytes))]
    TooLarge { path: PathBuf, size: u64, max_bytes: u64 },
    #[error("Error processing file: {0}")]
    Io(#[from] std::io::Error),
}

const MIB: u64 = 1024 * 1024;

/// Whole mebibytes print as "N MB", anything else as a byte count.
fn format_size(bytes: &u64) -> String {
    let bytes = *bytes;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MB", bytes / MIB)
    } else {
        format!("{bytes} bytes")
    }
}
