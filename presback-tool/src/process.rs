use anyhow::{Result, anyhow};
use glob::Pattern;
use presback_lib::display::{encode_size, format_time};
use std::{
    any::Any,
    io::{self, Write},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use crate::{
    fs_utils::{batch_totals, walk_directory},
    naming::{archive_names, base_dir_name},
    packaging::{ArchiveJob, ArchiveReport, Compressor, archive_directory_sync},
    progress::{Progress, WorkerProgress},
};

pub struct BackupOptions {
    pub compressor: Compressor,
    pub skip: Vec<Pattern>,
}

pub struct JobOutcome {
    pub job: ArchiveJob,
    pub result: Result<ArchiveReport>,
}

/// Pairs every sanitised directory with its archive inside `target_dir`.
pub fn build_jobs(paths: &[PathBuf], target_dir: &Path) -> Vec<ArchiveJob> {
    paths
        .iter()
        .zip(archive_names(paths))
        .map(|(source, file_name)| ArchiveJob {
            source: source.clone(),
            archive: target_dir.join(file_name),
            base: base_dir_name(source),
        })
        .collect()
}

/// Runs one OS thread per job and joins them in job order, advancing the
/// main bar after each join. Outcomes come back in job order.
pub fn run_backup(
    jobs: &[ArchiveJob],
    options: &BackupOptions,
    progress: &Progress,
) -> Vec<JobOutcome> {
    thread::scope(|scope| {
        let spawned: Vec<_> = jobs
            .iter()
            .enumerate()
            .map(|(i, job)| {
                let worker = progress.worker(i);
                let handle = thread::Builder::new()
                    .name(format!("archive-{i}"))
                    .spawn_scoped(scope, move || run_worker(job, options, &worker));
                (job, handle)
            })
            .collect();

        spawned
            .into_iter()
            .map(|(job, handle)| {
                let result = match handle {
                    Ok(handle) => handle.join().unwrap_or_else(|panic| {
                        Err(anyhow!("worker panicked: {}", panic_message(panic.as_ref())))
                    }),
                    Err(e) => Err(anyhow!(e).context("cannot spawn worker thread")),
                };
                progress.job_joined();
                JobOutcome {
                    job: job.clone(),
                    result,
                }
            })
            .collect()
    })
}

fn run_worker(
    job: &ArchiveJob,
    options: &BackupOptions,
    worker: &WorkerProgress,
) -> Result<ArchiveReport> {
    if !job.source.is_dir() {
        // The directory vanished after sanitising; nothing sensible to archive.
        worker.eprintln(&format!("[ERROR] - Invalid directory: {}", job.source.display()));
        std::process::exit(1);
    }

    tracing::debug!(source = %job.source.display(), archive = %job.archive.display(), "worker started");
    let result = archive_directory_sync(job, options.compressor, &options.skip, worker);

    match &result {
        Ok(report) => {
            worker.finish();
            tracing::debug!(source = %job.source.display(), files = report.files, "worker finished");
        }
        Err(err) => {
            worker.fail(&job.base);
            tracing::debug!(source = %job.source.display(), error = %err, "worker failed");
        }
    }
    result
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Lists what a backup would produce without writing anything.
pub fn dry_run(jobs: &[ArchiveJob], skip: &[Pattern], target_dir: &Path) -> Result<()> {
    write_dry_run(io::stdout().lock(), jobs, skip, target_dir)
}

fn write_dry_run<W: Write>(
    mut out: W,
    jobs: &[ArchiveJob],
    skip: &[Pattern],
    target_dir: &Path,
) -> Result<()> {
    writeln!(out, "--- DRY RUN ---")?;
    writeln!(out, "Output: '{}'", target_dir.display())?;
    for job in jobs {
        let name = archive_file_name(job);
        match walk_directory(&job.source, skip) {
            Ok(batches) => {
                let (files, bytes) = batch_totals(&batches);
                writeln!(
                    out,
                    "  {} -> {} ({} files, {} directories, {})",
                    job.source.display(),
                    name,
                    files,
                    batches.len(),
                    encode_size(bytes)
                )?;
            }
            Err(err) => writeln!(out, "  {} -> {} (unreadable: {err:#})", job.source.display(), name)?,
        }
    }
    Ok(())
}

/// Prints the summary and returns whether every job succeeded.
pub fn print_summary(outcomes: &[JobOutcome], target_dir: &Path, elapsed: Duration) -> bool {
    write_summary(io::stdout().lock(), outcomes, target_dir, elapsed).unwrap_or(false)
}

fn write_summary<W: Write>(
    mut out: W,
    outcomes: &[JobOutcome],
    target_dir: &Path,
    elapsed: Duration,
) -> io::Result<bool> {
    let mut all_ok = true;

    writeln!(out, "\nBack-Up Has Been Created At:\n'{}'", target_dir.display())?;
    for outcome in outcomes {
        let name = archive_file_name(&outcome.job);
        match &outcome.result {
            Ok(report) => writeln!(
                out,
                "  {}: {} files, {} -> {}",
                name,
                report.files,
                encode_size(report.bytes_in),
                encode_size(report.bytes_out)
            )?,
            Err(err) => {
                all_ok = false;
                writeln!(out, "  {name}: FAILED - {err:#}")?;
            }
        }
    }
    writeln!(out, "Time Taken: {}\n", format_time(elapsed))?;

    Ok(all_ok)
}

fn archive_file_name(job: &ArchiveJob) -> String {
    job.archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| job.base.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn options() -> BackupOptions {
        BackupOptions {
            compressor: Compressor::Deflate,
            skip: Vec::new(),
        }
    }

    fn source_tree(root: &Path, name: &str, files: usize) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(dir.join("inner")).unwrap();
        for i in 0..files {
            fs::write(dir.join("inner").join(format!("f{i}.txt")), format!("file {i}")).unwrap();
        }
        dir
    }

    #[test]
    fn jobs_get_unique_archives() {
        let paths = vec![PathBuf::from("/a/docs"), PathBuf::from("/b/docs")];
        let jobs = build_jobs(&paths, Path::new("/out/Home - 01.01.26"));

        assert_eq!(jobs[0].archive, PathBuf::from("/out/Home - 01.01.26/docs.zip"));
        assert_eq!(jobs[1].archive, PathBuf::from("/out/Home - 01.01.26/docs (2).zip"));
        assert_eq!(jobs[1].base, "docs");
    }

    #[test]
    fn every_directory_gets_its_own_archive() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let paths = vec![
            source_tree(src.path(), "one", 3),
            source_tree(src.path(), "two", 5),
            source_tree(src.path(), "three", 1),
        ];
        let jobs = build_jobs(&paths, out.path());
        let progress = Progress::new(jobs.len(), false);

        let outcomes = run_backup(&jobs, &options(), &progress);

        let files: Vec<usize> = outcomes
            .iter()
            .map(|o| o.result.as_ref().unwrap().files)
            .collect();
        assert_eq!(files, vec![3, 5, 1]);
        for job in &jobs {
            assert!(job.archive.is_file(), "missing {:?}", job.archive);
        }
    }

    #[test]
    fn one_failing_worker_does_not_stop_the_others() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let good = source_tree(src.path(), "good", 2);
        let bad = source_tree(src.path(), "bad", 2);
        let blocker = out.path().join("blocker");
        fs::write(&blocker, "a file where a directory should be").unwrap();

        let jobs = vec![
            ArchiveJob {
                source: bad,
                archive: blocker.join("bad.zip"),
                base: "bad".into(),
            },
            ArchiveJob {
                source: good,
                archive: out.path().join("good.zip"),
                base: "good".into(),
            },
        ];
        let progress = Progress::new(jobs.len(), false);
        let outcomes = run_backup(&jobs, &options(), &progress);

        assert!(outcomes[0].result.is_err());
        assert_eq!(outcomes[1].result.as_ref().unwrap().files, 2);
    }

    #[test]
    fn summary_reports_failures() {
        let outcomes = vec![
            JobOutcome {
                job: ArchiveJob {
                    source: "/a/docs".into(),
                    archive: "/out/docs.zip".into(),
                    base: "docs".into(),
                },
                result: Ok(ArchiveReport {
                    files: 4,
                    directories: 1,
                    bytes_in: 2048,
                    bytes_out: 1024,
                }),
            },
            JobOutcome {
                job: ArchiveJob {
                    source: "/a/music".into(),
                    archive: "/out/music.zip".into(),
                    base: "music".into(),
                },
                result: Err(anyhow!("disk full")),
            },
        ];

        let mut buf = Vec::new();
        let ok = write_summary(&mut buf, &outcomes, Path::new("/out"), Duration::from_secs(75))
            .unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(!ok);
        assert!(text.contains("'/out'"));
        assert!(text.contains("docs.zip: 4 files, 2 KiB -> 1 KiB"));
        assert!(text.contains("music.zip: FAILED - disk full"));
        assert!(text.contains("Time Taken: 1m:15s"));
    }

    #[test]
    fn dry_run_counts_without_writing() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let paths = vec![source_tree(src.path(), "docs", 2)];
        let target = out.path().join("Home - 01.01.26");
        let jobs = build_jobs(&paths, &target);

        let mut buf = Vec::new();
        write_dry_run(&mut buf, &jobs, &[], &target).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("docs.zip (2 files, 2 directories"));
        assert!(!target.exists());
    }
}
