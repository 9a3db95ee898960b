use anyhow::{Context, Result};
use async_zip::base::write::ZipFileWriter;
use async_zip::{Compression, ZipDateTime, ZipEntryBuilder};
use chrono::{DateTime, Utc};
use futures::io::AsyncWrite;
use glob::Pattern;
use std::path::{Component, Path};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::compat::TokioAsyncReadCompatExt;

use crate::fs_utils::walk_directory;
use crate::progress::WorkerProgress;

use super::{ArchiveJob, ArchiveReport};

/// Compression algorithm to use when creating the ZIP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compressor {
    Deflate,
    Stored,
}

impl Compressor {
    fn compression(self) -> Compression {
        match self {
            Compressor::Deflate => Compression::Deflate,
            Compressor::Stored => Compression::Stored,
        }
    }
}

/// Creates the archive file, creating parent directories if they don't exist.
pub async fn create_archive_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating directory {parent:?}"))?;
    }
    File::create(path)
        .await
        .with_context(|| format!("creating archive {path:?}"))
}

/// Name of `file` inside the archive: `<base>/<path relative to source>`,
/// always with forward slashes.
pub fn entry_name(base: &str, source: &Path, file: &Path) -> String {
    let rel = file.strip_prefix(source).unwrap_or(file);
    let mut name = base.to_string();
    for component in rel.components() {
        if let Component::Normal(part) = component {
            name.push('/');
            name.push_str(&part.to_string_lossy());
        }
    }
    name
}

/// Archives one source directory into `job.archive`.
///
/// The worker bar is sized to the number of directories in the walk and
/// advances after each one; every directory gets a transient file bar.
pub async fn archive_directory(
    job: &ArchiveJob,
    compressor: Compressor,
    skip: &[Pattern],
    progress: &WorkerProgress,
) -> Result<ArchiveReport> {
    let batches = walk_directory(&job.source, skip)?;
    progress.start(&job.base, batches.len());
    tracing::debug!(source = %job.source.display(), directories = batches.len(), "walk finished");

    let file = create_archive_file(&job.archive).await?;
    let mut writer = ZipFileWriter::with_tokio(file);
    let compression = compressor.compression();
    let mut report = ArchiveReport::default();

    for batch in &batches {
        let label = batch
            .dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| job.base.clone());
        let files_bar = progress.file_bar(&label, batch.files.len());

        for item in &batch.files {
            let name = entry_name(&job.base, &job.source, &item.path);
            write_file_entry(&mut writer, &item.path, name, compression)
                .await
                .with_context(|| format!("adding {:?} to {:?}", item.path, job.archive))?;
            report.files += 1;
            report.bytes_in += item.size;
            files_bar.file_done();
        }

        drop(files_bar);
        report.directories += 1;
        progress.directory_done();
    }

    let mut file = writer
        .close()
        .await
        .with_context(|| format!("finishing archive {:?}", job.archive))?
        .into_inner();
    file.flush().await?;

    report.bytes_out = tokio::fs::metadata(&job.archive).await?.len();
    Ok(report)
}

async fn write_file_entry<W>(
    writer: &mut ZipFileWriter<W>,
    path: &Path,
    name: String,
    compression: Compression,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let file = File::open(path).await?;
    let meta = file.metadata().await?;

    let mut builder = ZipEntryBuilder::new(name.into(), compression);
    if let Ok(modified) = meta.modified() {
        let modified: DateTime<Utc> = modified.into();
        builder = builder.last_modification_date(ZipDateTime::from_chrono(&modified));
    }

    let mut entry = writer.write_entry_stream(builder).await?;
    futures::io::copy(&mut file.compat(), &mut entry).await?;
    entry.close().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Progress;
    use async_zip::tokio::read::fs::ZipFileReader;
    use std::fs;
    use tempfile::TempDir;

    async fn entries_of(path: &Path) -> Vec<String> {
        let reader = ZipFileReader::new(path).await.unwrap();
        reader
            .file()
            .entries()
            .iter()
            .map(|e| e.filename().as_str().unwrap().to_string())
            .collect()
    }

    fn job(source: &Path, out: &Path) -> ArchiveJob {
        ArchiveJob {
            source: source.to_path_buf(),
            archive: out.join("nested/out/docs.zip"),
            base: "docs".to_string(),
        }
    }

    #[test]
    fn entry_names_use_forward_slashes() {
        let source = Path::new("/home/me/docs");
        assert_eq!(
            entry_name("docs", source, Path::new("/home/me/docs/a/b.txt")),
            "docs/a/b.txt"
        );
        assert_eq!(
            entry_name("docs", source, Path::new("/home/me/docs/top.txt")),
            "docs/top.txt"
        );
    }

    #[tokio::test]
    async fn archives_every_file_under_the_base_name() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("sub/deeper")).unwrap();
        fs::write(src.path().join("readme.txt"), "hello").unwrap();
        fs::write(src.path().join("sub/deeper/data.bin"), vec![7u8; 4096]).unwrap();

        let job = job(src.path(), out.path());
        let progress = Progress::new(1, false);
        let report = archive_directory(&job, Compressor::Deflate, &[], &progress.worker(0))
            .await
            .unwrap();

        assert_eq!(report.files, 2);
        assert_eq!(report.directories, 3);
        assert_eq!(report.bytes_in, 5 + 4096);
        assert!(report.bytes_out > 0);

        let names = entries_of(&job.archive).await;
        assert_eq!(names, vec!["docs/readme.txt", "docs/sub/deeper/data.bin"]);
    }

    #[tokio::test]
    async fn stored_entries_round_trip_content() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(src.path().join("note.txt"), "keep me").unwrap();

        let job = job(src.path(), out.path());
        let progress = Progress::new(1, false);
        archive_directory(&job, Compressor::Stored, &[], &progress.worker(0))
            .await
            .unwrap();

        let reader = ZipFileReader::new(&job.archive).await.unwrap();
        let mut entry = reader.reader_with_entry(0).await.unwrap();
        let mut text = String::new();
        entry.read_to_string_checked(&mut text).await.unwrap();
        assert_eq!(text, "keep me");
    }

    #[tokio::test]
    async fn skipped_files_are_left_out() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(src.path().join("keep.txt"), "1").unwrap();
        fs::write(src.path().join("drop.tmp"), "2").unwrap();

        let job = job(src.path(), out.path());
        let skip = vec![Pattern::new("*.tmp").unwrap()];
        let progress = Progress::new(1, false);
        let report = archive_directory(&job, Compressor::Deflate, &skip, &progress.worker(0))
            .await
            .unwrap();

        assert_eq!(report.files, 1);
        assert_eq!(entries_of(&job.archive).await, vec!["docs/keep.txt"]);
    }
}
