//! Moshh - command line front end
//!
//! ```text
//! moshh generate a.mov b.mov c.mov --weights 1,2,1 --output mashup.mov
//! moshh fingerprint a.mov --out a.json
//! moshh init-config
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use moshh_core::config::{ConfigManager, Settings};
use moshh_core::engine::FfmpegEngine;
use moshh_core::fingerprint::{fingerprint_media, ConstellationInfo};
use moshh_core::logging::{init_tracing, init_tracing_with_file, LogLevel, RunLogger};
use moshh_core::orchestrator::{GenerationOptions, GenerationRequest, MoshhGenerator, ProgressCallback};
use moshh_core::storage::{FileStore, LocalFileStore};

#[derive(Parser, Debug)]
#[command(name = "moshh", version, about = "Audio-aligned multi-camera mashups")]
struct Cli {
    /// Settings file (created with defaults when missing)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Align the sources and cut them into one video
    Generate {
        /// Clips of the same event (at least two)
        #[arg(required = true, num_args = 2..)]
        sources: Vec<PathBuf>,

        /// Selection weight per source, comma separated (default: all 1)
        #[arg(short, long, value_delimiter = ',')]
        weights: Vec<f64>,

        /// Output file (default: a new file in the output folder)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seed for a reproducible edit
        #[arg(long)]
        seed: Option<u64>,

        /// Shortest subclip in seconds
        #[arg(long)]
        min_subclip: Option<f64>,

        /// Longest subclip in seconds
        #[arg(long)]
        max_subclip: Option<f64>,

        /// Output container extension (mov, mp4, ...)
        #[arg(long)]
        format: Option<String>,

        /// Precomputed constellation JSON files, one per source
        #[arg(long, num_args = 1..)]
        constellations: Vec<PathBuf>,
    },

    /// Fingerprint one clip and save its constellation as JSON
    Fingerprint {
        source: PathBuf,

        #[arg(long)]
        out: PathBuf,
    },

    /// Write a settings file with every default filled in
    InitConfig {
        /// Overwrite an existing file with defaults
        #[arg(long)]
        force: bool,
    },
}

/// Per-user config path, falling back to `.config/settings.toml`.
fn default_config_path() -> PathBuf {
    ProjectDirs::from("io.github", "moshh", "moshh")
        .map(|dirs| dirs.config_dir().join("settings.toml"))
        .unwrap_or_else(|| PathBuf::from(".config").join("settings.toml"))
}

fn load_config(path: &Path) -> ConfigManager {
    let mut manager = ConfigManager::new(path);
    if let Err(e) = manager.load_or_create() {
        eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
    }
    manager
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    if let Command::InitConfig { force } = cli.command {
        init_tracing(LogLevel::Info);
        return init_config(&config_path, force);
    }

    let manager = load_config(&config_path);
    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        manager.settings().logging.level
    };
    if let Err(e) = manager.ensure_dirs_exist() {
        eprintln!("Warning: Failed to create directories: {}", e);
    }
    let _log_guard = init_tracing_with_file(level, &manager.logs_folder());

    tracing::info!("Moshh {} starting", moshh_core::version());
    tracing::info!("Config: {}", config_path.display());

    let settings = manager.settings().clone();
    match cli.command {
        Command::Generate {
            sources,
            weights,
            output,
            seed,
            min_subclip,
            max_subclip,
            format,
            constellations,
        } => {
            let weights = if weights.is_empty() {
                vec![1.0; sources.len()]
            } else {
                weights
            };
            let constellations = load_constellations(&constellations)?;
            let options = GenerationOptions {
                min_subclip_secs: min_subclip,
                max_subclip_secs: max_subclip,
                output_format: format,
                constellations,
                encode: None,
                seed,
            };
            let mut request = GenerationRequest::new(sources, weights).with_options(options);
            request.output = output;
            generate(settings, request)
        }
        Command::Fingerprint { source, out } => fingerprint(&settings, &source, &out),
        Command::InitConfig { .. } => Ok(()),
    }
}

fn generate(settings: Settings, request: GenerationRequest) -> Result<()> {
    let generator = MoshhGenerator::from_settings(settings);
    generator.configure().context("Failed to prepare temp folder")?;

    let progress: ProgressCallback = Box::new(|stage, percent, message| {
        eprintln!("[{:>3}%] {}: {}", percent, stage, message);
    });

    match generator.generate(request, Some(progress)) {
        Ok(output) => {
            println!("{}", output.display());
            Ok(())
        }
        Err(e) => {
            if let Some(diagnostic) = e.diagnostic() {
                eprintln!("{}", diagnostic.trim_end());
            }
            Err(e).context("Generation failed")
        }
    }
}

fn load_constellations(paths: &[PathBuf]) -> Result<Option<Vec<ConstellationInfo>>> {
    if paths.is_empty() {
        return Ok(None);
    }
    let loaded = paths
        .iter()
        .map(|path| {
            ConstellationInfo::load_json(path)
                .with_context(|| format!("Failed to load constellation {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(loaded))
}

fn fingerprint(settings: &Settings, source: &Path, out: &Path) -> Result<()> {
    let engine = FfmpegEngine::new()
        .with_ffmpeg_path(&settings.tools.ffmpeg_path)
        .with_ffprobe_path(&settings.tools.ffprobe_path);
    let store = LocalFileStore::new(&settings.paths.temp_root);
    let logger = RunLogger::detached("fingerprint", settings.logging.to_log_config());
    let scratch = PathBuf::from(format!("fingerprint-{}", std::process::id()));

    let result = fingerprint_media(&engine, &store, &logger, &scratch, source, settings);
    if store.exists(&scratch) {
        if let Err(e) = store.remove_directory(&scratch) {
            tracing::warn!("Could not remove {}: {}", scratch.display(), e);
        }
    }

    let info = result.with_context(|| format!("Failed to fingerprint {}", source.display()))?;
    if info.landmark_count() == 0 {
        bail!("{} produced no landmarks", source.display());
    }
    info.save_json(out)
        .with_context(|| format!("Failed to write {}", out.display()))?;

    println!(
        "{}: {} landmarks at {} Hz -> {}",
        source.display(),
        info.landmark_count(),
        info.sample_rate,
        out.display()
    );
    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    let mut manager = ConfigManager::new(path);
    if force {
        *manager.settings_mut() = Settings::default();
        manager
            .save()
            .with_context(|| format!("Failed to write {}", path.display()))?;
    } else {
        manager
            .load_or_create()
            .with_context(|| format!("Failed to initialise {}", path.display()))?;
    }
    println!("{}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_generate_weights() {
        let cli = Cli::parse_from([
            "moshh", "generate", "a.mov", "b.mov", "--weights", "1,2.5", "--seed", "9",
        ]);
        match cli.command {
            Command::Generate {
                sources,
                weights,
                seed,
                ..
            } => {
                assert_eq!(sources.len(), 2);
                assert_eq!(weights, vec![1.0, 2.5]);
                assert_eq!(seed, Some(9));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn generate_needs_two_sources() {
        assert!(Cli::try_parse_from(["moshh", "generate", "a.mov"]).is_err());
    }

    #[test]
    fn missing_constellations_are_none() {
        assert!(load_constellations(&[]).unwrap().is_none());
    }
}
