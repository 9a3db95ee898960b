use anyhow::{Context, Result, bail};
use std::{
    fs,
    io::{BufRead, Write},
    path::{Path, PathBuf},
};

/// Lists the preset files in `dir`, sorted by name.
pub fn list_presets(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut presets = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading presets directory {dir:?}"))? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && entry.file_name() != ".gitkeep" {
            presets.push(path);
        }
    }

    if presets.is_empty() {
        bail!("You Must Create A Preset To Continue");
    }

    presets.sort();
    Ok(presets)
}

/// Shows a numbered menu and keeps asking until a `.txt` preset is chosen.
pub fn select_preset<R: BufRead, W: Write>(
    presets: &[PathBuf],
    mut input: R,
    mut out: W,
) -> Result<PathBuf> {
    loop {
        writeln!(out, "\nPlease Select A Preset To Continue:")?;
        for (i, preset) in presets.iter().enumerate() {
            let name = preset
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            writeln!(out, "\t{} : {}", i + 1, name)?;
        }
        write!(out, "Selection: ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            bail!("no preset selected");
        }

        let chosen = line
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| presets.get(i));

        match chosen {
            Some(path) if is_txt(path) => return Ok(path.clone()),
            Some(_) => writeln!(out, "[ERROR] - Preset Must Be Type Txt")?,
            None => writeln!(out, "[ERROR] - You Have Not Selected A Valid Option")?,
        }
    }
}

fn is_txt(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
}
