use anyhow::Result;
use glob::Pattern;
use std::path::PathBuf;
use tokio::runtime::Builder;

use crate::progress::WorkerProgress;

pub mod zip;

pub use zip::Compressor;

/// One source directory and the archive it is written to.
#[derive(Debug, Clone)]
pub struct ArchiveJob {
    pub source: PathBuf,
    pub archive: PathBuf,
    /// Top-level folder inside the archive and the worker bar label.
    pub base: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    pub files: usize,
    pub directories: usize,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

/// Archives one directory on the calling thread, managing its own async
/// runtime.
///
/// This is the entrypoint for worker threads: each gets a current-thread
/// runtime, so a worker never waits on another worker's I/O.
pub fn archive_directory_sync(
    job: &ArchiveJob,
    compressor: Compressor,
    skip: &[Pattern],
    progress: &WorkerProgress,
) -> Result<ArchiveReport> {
    let rt = Builder::new_current_thread().enable_all().build()?;
    rt.block_on(zip::archive_directory(job, compressor, skip, progress))
}
