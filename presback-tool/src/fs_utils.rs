use anyhow::{Context, Result, bail};
use glob::Pattern;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// A regular file found while walking a source directory.
#[derive(Debug, Clone)]
pub struct FileItem {
    pub path: PathBuf,
    pub size: u64,
}

/// One directory of a walk and the files directly inside it.
#[derive(Debug, Clone)]
pub struct DirBatch {
    pub dir: PathBuf,
    pub files: Vec<FileItem>,
}

/// Compile skip patterns with proper error handling
pub fn compile_skip_patterns(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| Pattern::new(p).with_context(|| format!("invalid skip pattern: {p}")))
        .collect()
}

/// A pattern skips a path if it matches either the path relative to the walk
/// root or the last component, so both `*/cache/*` and `node_modules` work.
/// Components above the root never take part in matching.
pub fn is_skipped(root: &Path, path: &Path, patterns: &[Pattern]) -> bool {
    let rel = path.strip_prefix(root).unwrap_or(path).to_string_lossy();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    patterns
        .iter()
        .any(|p| p.matches(&rel) || p.matches(&name))
}

/// Lists `root` directory by directory: the root first, then its subtrees
/// depth-first in name order. Skipped paths prune whole subtrees and
/// symlinks are not followed. Unreadable entries are logged and left out.
pub fn walk_directory(root: &Path, skip: &[Pattern]) -> Result<Vec<DirBatch>> {
    let mut batches: Vec<DirBatch> = Vec::new();
    let mut index: HashMap<PathBuf, usize> = HashMap::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped(root, e.path(), skip));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(root = %root.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            index.insert(entry.path().to_path_buf(), batches.len());
            batches.push(DirBatch {
                dir: entry.into_path(),
                files: Vec::new(),
            });
        } else if file_type.is_file() {
            let size = entry
                .metadata()
                .with_context(|| format!("reading metadata of {:?}", entry.path()))?
                .len();
            let slot = entry.path().parent().and_then(|p| index.get(p)).copied();
            if let Some(i) = slot {
                batches[i].files.push(FileItem {
                    path: entry.into_path(),
                    size,
                });
            }
        } else {
            tracing::debug!(path = %entry.path().display(), "not a regular file, left out");
        }
    }

    if batches.is_empty() {
        bail!("cannot read directory {}", root.display());
    }

    Ok(batches)
}

/// Total number of files and bytes in a walk.
pub fn batch_totals(batches: &[DirBatch]) -> (usize, u64) {
    batches.iter().flat_map(|b| &b.files).fold((0, 0), |(n, bytes), f| {
        (n + 1, bytes + f.size)
    })
}
