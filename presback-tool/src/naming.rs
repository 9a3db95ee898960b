use anyhow::{Result, anyhow};
use chrono::{Local, NaiveDate};
use presback_lib::preset::preset_stem;
use std::collections::HashSet;
use std::fmt::Write;
use std::path::{Component, Path, PathBuf};

/// `"<preset stem> - <date>"`, e.g. `Home - 16.10.26`.
pub fn archive_folder_name(preset: &Path, date: NaiveDate, date_format: &str) -> Result<String> {
    let mut name = format!("{} - ", preset_stem(preset));
    // `format!` would panic on a bad format string, `write!` reports it.
    write!(name, "{}", date.format(date_format))
        .map_err(|_| anyhow!("invalid date format: {date_format}"))?;
    Ok(name)
}

/// Dated backup folder for today under `root`.
pub fn output_dir(root: &Path, preset: &Path, date_format: &str) -> Result<PathBuf> {
    let name = archive_folder_name(preset, Local::now().date_naive(), date_format)?;
    Ok(root.join(name))
}

/// Name used for a source directory inside the backup: its last component,
/// or a flattened form of a bare root like `C:\`.
pub fn base_dir_name(path: &Path) -> String {
    if let Some(name) = path.file_name() {
        return name.to_string_lossy().into_owned();
    }

    let flat: String = path
        .components()
        .filter_map(|c| match c {
            Component::Prefix(p) => Some(p.as_os_str().to_string_lossy().into_owned()),
            Component::Normal(n) => Some(n.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<String>()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();

    if flat.is_empty() { "root".to_string() } else { flat }
}

/// One `.zip` file name per source directory. A name already handed out
/// (compared case-insensitively) gets ` (2)`, ` (3)`, ... until it is unused,
/// so no two workers write the same archive.
pub fn archive_names(paths: &[PathBuf]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    paths
        .iter()
        .map(|path| {
            let base = base_dir_name(path);
            let mut name = format!("{base}.zip");
            let mut n = 1;
            while !taken.insert(name.to_lowercase()) {
                n += 1;
                name = format!("{base} ({n}).zip");
            }
            name
        })
        .collect()
}
