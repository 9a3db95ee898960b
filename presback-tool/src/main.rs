use anyhow::Context;
use clap::Parser;
use presback_lib::{Config, preset, sanitise};
use std::{
    collections::HashMap,
    env, fs, io,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::Level;

mod fs_utils;
mod menu;
mod naming;
mod packaging;
mod process;
mod progress;

use packaging::Compressor;
use process::{BackupOptions, build_jobs, dry_run, print_summary, run_backup};
use progress::Progress;

#[derive(Parser, Debug)]
#[command(author, version, about = "Back up every directory listed in a preset", long_about = None)]
pub struct Cli {
    /// Preset file to use instead of picking one from the menu
    #[arg(short, long)]
    pub preset: Option<String>,

    /// Directory holding the preset files shown in the menu
    #[arg(long)]
    pub presets_dir: Option<String>,

    /// Directory the dated backup folders are created in
    #[arg(short, long)]
    pub output_root: Option<String>,

    /// Configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<String>,

    /// chrono format string for the date in the backup folder name
    #[arg(long)]
    pub date_format: Option<String>,

    /// Store files without compression
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub store: bool,

    /// Glob patterns to leave out of the archives (can be specified multiple times)
    #[arg(short = 's', long)]
    pub skip: Vec<String>,

    /// Dry run (list what would be archived)
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    pub dry: bool,

    /// Disable progress bars
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub no_progress: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Generate YAML config to stdout
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub generate_yaml_config: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("[ERROR] - {e:#}");
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

/// Returns `Ok(false)` when the backup ran but at least one archive failed.
fn run(cli: Cli) -> anyhow::Result<bool> {
    // Step 1: Read environment
    let env_config = read_env();

    // Step 2: Read config file (if exists)
    let mut file_config = Config::default();
    if let Some(path) = cli.config.clone().or(env_config.config.clone()) {
        file_config = read_config_file(&path)?;
    }

    // Step 3: Merge configs: env < file < CLI
    let merged = merge_configs(env_config, file_config, cli_to_config(&cli));
    tracing::debug!(?merged, "configuration resolved");

    if cli.generate_yaml_config {
        let yaml = serde_yaml::to_string(&merged)?;
        println!("{yaml}");
        return Ok(true);
    }

    let program_dir = env::current_dir().context("cannot determine the working directory")?;

    let chosen_preset = match &merged.preset {
        Some(p) => PathBuf::from(p),
        None => {
            let presets = menu::list_presets(Path::new(merged.presets_dir()))?;
            let stdin = io::stdin();
            menu::select_preset(&presets, stdin.lock(), io::stdout())?
        }
    };
    tracing::info!(preset = %chosen_preset.display(), "preset selected");

    let entries = preset::read_preset(&chosen_preset)?;
    let output_root = program_dir.join(merged.output_root());
    let sanitised = sanitise::sanitise_paths(&entries, &program_dir, &[output_root.clone()]);
    let sanitised = match sanitised {
        Ok(s) => {
            for rejection in &s.rejections {
                eprintln!("[ERROR] - {rejection}");
            }
            s
        }
        Err(e) => anyhow::bail!("{e} Exiting."),
    };

    let target_dir = naming::output_dir(&output_root, &chosen_preset, merged.date_format())?;
    let jobs = build_jobs(&sanitised.paths, &target_dir);

    let options = BackupOptions {
        compressor: if merged.compress() {
            Compressor::Deflate
        } else {
            Compressor::Stored
        },
        skip: fs_utils::compile_skip_patterns(merged.skip())?,
    };

    if merged.dry() {
        dry_run(&jobs, &options.skip, &target_dir)?;
        return Ok(true);
    }

    fs::create_dir_all(&target_dir)
        .with_context(|| format!("cannot create output directory {}", target_dir.display()))?;

    println!("\nCreating Archive:");
    let progress = Progress::new(jobs.len(), merged.progress());
    let start = Instant::now();
    let outcomes = run_backup(&jobs, &options, &progress);
    progress.finish();

    Ok(print_summary(&outcomes, &target_dir, start.elapsed()))
}

/// Reads environment variables prefixed with PRESBACK_
fn read_env() -> Config {
    config_from_vars(&env::vars().collect())
}

fn config_from_vars(vars: &HashMap<String, String>) -> Config {
    let mut cfg = Config::default();

    macro_rules! get_env {
        ($key:expr) => {
            vars.get(&format!("PRESBACK_{}", $key)).cloned()
        };
    }

    fn flag(v: String) -> bool {
        v == "true" || v == "1" || v.eq_ignore_ascii_case("yes")
    }

    cfg.config = get_env!("CONFIG");
    cfg.preset = get_env!("PRESET");
    cfg.presets_dir = get_env!("PRESETS_DIR");
    cfg.output_root = get_env!("OUTPUT_ROOT");
    cfg.date_format = get_env!("DATE_FORMAT");
    cfg.compress = get_env!("COMPRESS").map(flag);
    cfg.dry = get_env!("DRY").map(flag);
    cfg.progress = get_env!("PROGRESS").map(flag);
    cfg.skip = get_env!("SKIP").map(|v| {
        v.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    });
    cfg
}

/// Reads YAML or JSON config from file
fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let content =
        fs::read_to_string(path).with_context(|| format!("cannot read config file {path}"))?;
    let lower = path.to_lowercase();
    let cfg = if lower.ends_with(".json") {
        serde_json::from_str(&content).with_context(|| format!("invalid JSON in {path}"))?
    } else {
        serde_yaml::from_str(&content).with_context(|| format!("invalid YAML in {path}"))?
    };
    Ok(cfg)
}

/// Converts CLI struct into Config. Switches left off stay `None` so they
/// don't mask the file or environment.
fn cli_to_config(cli: &Cli) -> Config {
    Config {
        config: cli.config.clone(),
        preset: cli.preset.clone(),
        presets_dir: cli.presets_dir.clone(),
        output_root: cli.output_root.clone(),
        date_format: cli.date_format.clone(),
        compress: cli.store.then_some(false),
        dry: cli.dry.then_some(true),
        progress: cli.no_progress.then_some(false),
        skip: if cli.skip.is_empty() {
            None
        } else {
            Some(cli.skip.clone())
        },
    }
}

/// Merge configs by priority: env < file < cli
fn merge_configs(env: Config, file: Config, cli: Config) -> Config {
    fn pick<T>(env: Option<T>, file: Option<T>, cli: Option<T>) -> Option<T> {
        cli.or(file).or(env)
    }

    Config {
        config: pick(env.config, file.config, cli.config),
        preset: pick(env.preset, file.preset, cli.preset),
        presets_dir: pick(env.presets_dir, file.presets_dir, cli.presets_dir),
        output_root: pick(env.output_root, file.output_root, cli.output_root),
        date_format: pick(env.date_format, file.date_format, cli.date_format),
        compress: pick(env.compress, file.compress, cli.compress),
        dry: pick(env.dry, file.dry, cli.dry),
        progress: pick(env.progress, file.progress, cli.progress),
        skip: pick(env.skip, file.skip, cli.skip),
    }
}
