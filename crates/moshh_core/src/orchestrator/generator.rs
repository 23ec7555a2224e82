//! Run entry point: request validation, run setup, pipeline, cleanup.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rayon::prelude::*;
use uuid::Uuid;

use super::artifacts::cleanup_run;
use super::create_standard_pipeline;
use super::errors::{MoshhError, MoshhResult};
use super::pipeline::CancelHandle;
use super::types::{Context, ProgressCallback, RunState};
use crate::config::Settings;
use crate::engine::{FfmpegEngine, MediaEngine};
use crate::fingerprint::ConstellationInfo;
use crate::logging::RunLogger;
use crate::models::{EncodeProfile, MediaSource, ProgressStage};
use crate::storage::{FileStore, LocalFileStore, StorageError, StoreEntry};
use crate::timeline::{validate_weights, SubclipBounds};

/// Per-request overrides of the configured generation settings.
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    pub min_subclip_secs: Option<f64>,
    pub max_subclip_secs: Option<f64>,
    pub output_format: Option<String>,
    /// One per source, in source order. Skips fingerprinting.
    pub constellations: Option<Vec<ConstellationInfo>>,
    pub encode: Option<EncodeProfile>,
    pub seed: Option<u64>,
}

impl GenerationOptions {
    /// Settings with these overrides applied.
    pub fn apply(&self, settings: &Settings) -> Settings {
        let mut effective = settings.clone();
        let generation = &mut effective.generation;
        if let Some(min) = self.min_subclip_secs {
            generation.min_subclip_secs = min;
        }
        if let Some(max) = self.max_subclip_secs {
            generation.max_subclip_secs = max;
        }
        if let Some(ref format) = self.output_format {
            generation.output_format = format.clone();
        }
        if self.seed.is_some() {
            generation.seed = self.seed;
        }
        if let Some(ref encode) = self.encode {
            effective.encode = encode.clone();
        }
        effective
    }
}

/// One mashup to generate.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub sources: Vec<PathBuf>,
    /// Selection weight per source.
    pub weights: Vec<f64>,
    /// Final artifact path. Allocated in the output folder when unset.
    pub output: Option<PathBuf>,
    pub options: GenerationOptions,
}

impl GenerationRequest {
    pub fn new(sources: Vec<PathBuf>, weights: Vec<f64>) -> Self {
        Self {
            sources,
            weights,
            ..Default::default()
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

/// Holds the engine, store and settings shared by every run.
pub struct MoshhGenerator {
    engine: Arc<dyn MediaEngine>,
    store: Arc<dyn FileStore>,
    settings: Settings,
}

impl MoshhGenerator {
    pub fn new(engine: Arc<dyn MediaEngine>, store: Arc<dyn FileStore>, settings: Settings) -> Self {
        Self {
            engine,
            store,
            settings,
        }
    }

    /// FFmpeg engine and a local store rooted at `paths.temp_root`.
    pub fn from_settings(settings: Settings) -> Self {
        let engine = FfmpegEngine::new()
            .with_ffmpeg_path(&settings.tools.ffmpeg_path)
            .with_ffprobe_path(&settings.tools.ffprobe_path);
        let store = LocalFileStore::new(&settings.paths.temp_root);
        Self::new(Arc::new(engine), Arc::new(store), settings)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Create the temp root and remove namespaces left behind by dead runs.
    ///
    /// Only entries untouched for `paths.stale_temp_hours` are removed, so
    /// runs in other processes sharing the root keep their files. Returns
    /// the number of entries removed.
    pub fn configure(&self) -> MoshhResult<usize> {
        let root = Path::new("");
        let max_age = Duration::from_secs(self.settings.paths.stale_temp_hours.saturating_mul(3600));
        let setup_err = |e: StorageError| MoshhError::setup("configure", e.to_string());

        self.store.make_directory(root).map_err(setup_err)?;
        let stale: Vec<StoreEntry> = self
            .store
            .list_directory(root)
            .map_err(setup_err)?
            .into_iter()
            .filter(|entry| entry.age() >= max_age)
            .collect();

        for entry in &stale {
            let removed = if entry.is_dir {
                self.store
                    .clean_directory(&entry.path)
                    .and_then(|_| self.store.remove_directory(&entry.path))
            } else {
                self.store.delete_file(&entry.path)
            };
            removed.map_err(setup_err)?;
            tracing::info!("Removed stale temp entry {}", entry.path.display());
        }

        tracing::debug!(
            "Temp root ready: {} ({} stale entries removed)",
            self.store.absolute_path(root).display(),
            stale.len()
        );
        Ok(stale.len())
    }

    pub fn generate(
        &self,
        request: GenerationRequest,
        progress: Option<ProgressCallback>,
    ) -> MoshhResult<PathBuf> {
        self.generate_cancellable(request, progress, &CancelHandle::new())
    }

    /// Generate a mashup, returning the path of the final artifact.
    ///
    /// The run stops at the next stage boundary once `cancel` is triggered.
    pub fn generate_cancellable(
        &self,
        request: GenerationRequest,
        progress: Option<ProgressCallback>,
        cancel: &CancelHandle,
    ) -> MoshhResult<PathBuf> {
        let settings = request.options.apply(&self.settings);
        check_request(&request, &settings)?;

        let run_id = Uuid::new_v4().to_string();
        let logger = Arc::new(self.create_logger(&run_id, &settings));
        logger.section(&format!("Run {}", run_id));

        let sources = self.probe_sources(&run_id, &logger, &request.sources)?;
        for source in &sources {
            logger.info(&format!(
                "{}: {} ({:.3}s)",
                source.label(),
                source.path.display(),
                source.duration_secs
            ));
        }

        let output = match request.output {
            Some(ref path) => path.clone(),
            None => allocate_output(&settings),
        };
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                MoshhError::setup(&run_id, format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        let output_existed = output.exists();

        let namespace = PathBuf::from(&run_id);
        self.store
            .make_directory(&namespace)
            .map_err(|e| MoshhError::setup(&run_id, e.to_string()))?;

        let seed = settings.generation.seed.unwrap_or_else(rand::random);
        logger.info(&format!("Seed: {}", seed));

        let ctx = Context::new(
            &run_id,
            settings,
            sources,
            request.weights.clone(),
            namespace.clone(),
            output.clone(),
            Arc::clone(&self.engine),
            Arc::clone(&self.store),
            Arc::clone(&logger),
        )
        .with_precomputed(request.options.constellations.clone())
        .with_seed(seed)
        .with_progress_callback(progress);

        let mut state = RunState::new(&run_id);
        let pipeline = create_standard_pipeline().with_cancel_handle(cancel);
        let result = pipeline.run(&ctx, &mut state);

        logger.phase(ProgressStage::CleaningUp.label());
        ctx.report_progress(ProgressStage::CleaningUp, 0, "Removing temporary files");
        let report = cleanup_run(self.store.as_ref(), &logger, &namespace, &state.artifacts);
        if !report.failed.is_empty() {
            logger.warn(&format!("{} temp file(s) left behind", report.failed.len()));
        }
        ctx.report_progress(ProgressStage::CleaningUp, 100, "Temporary files removed");

        match result {
            Ok(run) => {
                ctx.report_progress(ProgressStage::Finished, 100, "Done");
                logger.success(&format!(
                    "{} stages run ({} skipped), output {}",
                    run.total_steps(),
                    run.steps_skipped.len(),
                    output.display()
                ));
                logger.close();
                Ok(output)
            }
            Err(e) => {
                if e.diagnostic().is_some() {
                    logger.show_tail("engine");
                }
                if !output_existed && output.exists() {
                    if let Err(remove_err) = fs::remove_file(&output) {
                        logger.warn(&format!(
                            "Could not remove partial output {}: {}",
                            output.display(),
                            remove_err
                        ));
                    }
                }
                ctx.report_progress(ProgressStage::Finished, 100, "Failed");
                logger.error(&e.to_string());
                logger.close();
                Err(e)
            }
        }
    }

    fn create_logger(&self, run_id: &str, settings: &Settings) -> RunLogger {
        let config = settings.logging.to_log_config();
        if !settings.logging.run_log_files {
            return RunLogger::detached(run_id, config);
        }

        match RunLogger::new(run_id, &settings.paths.logs_folder, config.clone(), None) {
            Ok(logger) => logger,
            Err(e) => {
                tracing::warn!("Run log file unavailable, logging to tracing only: {}", e);
                RunLogger::detached(run_id, config)
            }
        }
    }

    /// Probe every source in parallel.
    fn probe_sources(
        &self,
        run_id: &str,
        logger: &RunLogger,
        paths: &[PathBuf],
    ) -> MoshhResult<Vec<MediaSource>> {
        let probed: MoshhResult<Vec<MediaSource>> = paths
            .par_iter()
            .enumerate()
            .map(|(idx, path)| {
                let info = self.engine.probe(path).map_err(|source| MoshhError::SourceProbe {
                    run_id: run_id.to_string(),
                    path: path.clone(),
                    source,
                })?;
                let mut source = MediaSource::new(idx, path.clone(), info.duration_secs);
                source.sample_rate = info.sample_rate;
                Ok(source)
            })
            .collect();

        if let Err(ref e) = probed {
            logger.error(&e.to_string());
        }
        probed
    }
}

/// Generate with a one-off [`MoshhGenerator`] built from `settings`.
pub fn generate_moshh(
    settings: Settings,
    request: GenerationRequest,
    progress: Option<ProgressCallback>,
) -> MoshhResult<PathBuf> {
    MoshhGenerator::from_settings(settings).generate(request, progress)
}

/// Reject malformed requests before anything touches the filesystem.
fn check_request(request: &GenerationRequest, settings: &Settings) -> MoshhResult<()> {
    let count = request.sources.len();
    if count < 2 {
        return Err(MoshhError::precondition(format!(
            "at least 2 sources are required, got {}",
            count
        )));
    }
    if request.weights.len() != count {
        return Err(MoshhError::precondition(format!(
            "{} weights given for {} sources",
            request.weights.len(),
            count
        )));
    }
    validate_weights(&request.weights).map_err(|e| MoshhError::precondition(e.to_string()))?;

    let generation = &settings.generation;
    SubclipBounds::new(generation.min_subclip_secs, generation.max_subclip_secs)
        .validate()
        .map_err(|e| MoshhError::precondition(e.to_string()))?;

    if generation.output_format.trim().is_empty() {
        return Err(MoshhError::precondition("output format is empty"));
    }

    if let Some(ref constellations) = request.options.constellations {
        if constellations.len() != count {
            return Err(MoshhError::precondition(format!(
                "{} constellations given for {} sources",
                constellations.len(),
                count
            )));
        }
    }
    Ok(())
}

/// `<output_folder>/moshh<random>.<format>`
fn allocate_output(settings: &Settings) -> PathBuf {
    Path::new(&settings.paths.output_folder).join(format!(
        "moshh{}.{}",
        rand::random::<u32>(),
        settings.generation.output_format
    ))
}
