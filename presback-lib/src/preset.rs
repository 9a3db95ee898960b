use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("could not read preset '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Splits preset text into directory entries, one per line.
pub fn parse_preset(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.trim_end_matches('\r').trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn read_preset(path: &Path) -> Result<Vec<String>, PresetError> {
    let text = fs::read_to_string(path).map_err(|source| PresetError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_preset(&text))
}

/// Base name of the preset file without its extension, e.g. `Work` for
/// `Presets/Work.txt`.
pub fn preset_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "preset".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_lines_and_drops_blanks() {
        let text = "/home/me/docs\r\n\r\n  /srv/data  \n\n/etc\n";
        assert_eq!(parse_preset(text), vec!["/home/me/docs", "/srv/data", "/etc"]);
    }

    #[test]
    fn empty_text_has_no_entries() {
        assert!(parse_preset("").is_empty());
        assert!(parse_preset("\n\n").is_empty());
    }

    #[test]
    fn stem_strips_directory_and_extension() {
        assert_eq!(preset_stem(Path::new("Presets/Work.txt")), "Work");
        assert_eq!(preset_stem(Path::new("Photos")), "Photos");
    }

    #[test]
    fn missing_preset_reports_its_path() {
        let err = read_preset(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.txt"));
    }

    #[test]
    fn reads_preset_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("Home.txt");
        fs::write(&file, "/a\n/b\n").unwrap();
        assert_eq!(read_preset(&file).unwrap(), vec!["/a", "/b"]);
    }
}
