use std::path::{Path, PathBuf};

use thiserror::Error;

/// A preset entry that was dropped, with the reason shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("'{}' is not a valid directory, removed from list.", path.display())]
    NotADirectory { path: PathBuf },

    #[error("'{}' is duplicated {count} times, removed all but 1 from list.", path.display())]
    Duplicate { path: PathBuf, count: usize },

    #[error("'{}' is already being backed up with '{}', removed from list.", path.display(), within.display())]
    Embedded { path: PathBuf, within: PathBuf },

    #[error("'{}' overlaps with '{}', removed from list.", path.display(), protected.display())]
    Overlaps { path: PathBuf, protected: PathBuf },
}

/// Nothing is left to back up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitiseError {
    #[error("No directories to process.")]
    NoPaths,

    #[error("No valid directories to process.")]
    NoValidPaths,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitised {
    /// Surviving directories, in preset order.
    pub paths: Vec<PathBuf>,
    /// Every dropped entry, in the order it was detected.
    pub rejections: Vec<Rejection>,
}

/// True if either path lies within (or is) the other.
pub fn overlaps(a: &Path, b: &Path) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

/// Filters raw preset entries down to a set of directories that can be
/// archived independently.
///
/// Each stage works on the output of the previous one and keeps first
/// occurrences in order:
///
/// 1. blank entries are ignored,
/// 2. entries rejected by `is_dir` are dropped,
/// 3. duplicates collapse to their first instance,
/// 4. entries overlapping any `protected` directory are dropped,
/// 5. entries lying inside another surviving entry are dropped.
///
/// Comparison is component-wise, so `/a/b` is inside `/a` while `/ab` is not.
pub fn sanitise_paths_with<S, F>(
    raw: &[S],
    protected: &[PathBuf],
    is_dir: F,
) -> Result<Sanitised, SanitiseError>
where
    S: AsRef<str>,
    F: Fn(&Path) -> bool,
{
    let candidates: Vec<PathBuf> = raw
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect();

    if candidates.is_empty() {
        return Err(SanitiseError::NoPaths);
    }

    let mut rejections = Vec::new();

    let existing: Vec<PathBuf> = candidates
        .into_iter()
        .filter(|path| {
            let ok = is_dir(path);
            if !ok {
                rejections.push(Rejection::NotADirectory { path: path.clone() });
            }
            ok
        })
        .collect();

    let mut unique: Vec<PathBuf> = Vec::with_capacity(existing.len());
    for path in &existing {
        if unique.contains(path) {
            continue;
        }
        let count = existing.iter().filter(|p| *p == path).count();
        if count > 1 {
            rejections.push(Rejection::Duplicate {
                path: path.clone(),
                count,
            });
        }
        unique.push(path.clone());
    }

    let outside: Vec<PathBuf> = unique
        .into_iter()
        .filter(|path| match protected.iter().find(|dir| overlaps(path, dir)) {
            Some(dir) => {
                rejections.push(Rejection::Overlaps {
                    path: path.clone(),
                    protected: dir.clone(),
                });
                false
            }
            None => true,
        })
        .collect();

    let mut paths = Vec::with_capacity(outside.len());
    for path in &outside {
        // `outside` holds no duplicates, so any other prefix is a strict ancestor.
        match outside
            .iter()
            .find(|other| *other != path && path.starts_with(other))
        {
            Some(within) => rejections.push(Rejection::Embedded {
                path: path.clone(),
                within: within.clone(),
            }),
            None => paths.push(path.clone()),
        }
    }

    if paths.is_empty() {
        return Err(SanitiseError::NoValidPaths);
    }

    Ok(Sanitised { paths, rejections })
}

/// Sanitises entries against the real file system.
///
/// Relative entries are resolved against `program_dir`, which is always
/// protected along with `extra_protected`.
pub fn sanitise_paths<S: AsRef<str>>(
    raw: &[S],
    program_dir: &Path,
    extra_protected: &[PathBuf],
) -> Result<Sanitised, SanitiseError> {
    let resolved: Vec<String> = raw
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .map(|s| resolve(program_dir, Path::new(s)).to_string_lossy().into_owned())
        .collect();

    let mut protected = vec![program_dir.to_path_buf()];
    protected.extend(extra_protected.iter().map(|p| resolve(program_dir, p)));

    sanitise_paths_with(&resolved, &protected, Path::is_dir)
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
