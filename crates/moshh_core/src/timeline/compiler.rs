//! Rendering a plan through the media engine and joining the result.

use std::path::{Path, PathBuf};

use rand::Rng;

use super::{build_plan, SubclipBounds, TimelineResult, TimelineSource};
use crate::engine::{commands, run_command, MediaEngine};
use crate::logging::{no_progress, ItemProgress, RunLogger};
use crate::models::{CompilationPlan, EncodeProfile};
use crate::storage::{discard, FileStore};

/// Store-relative outputs of a compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledVideo {
    pub plan: CompilationPlan,
    pub list_file: PathBuf,
    /// Silent concatenation of every subclip.
    pub video: PathBuf,
}

impl CompiledVideo {
    /// Every file the compilation left in the store.
    pub fn artifacts(&self) -> Vec<PathBuf> {
        let mut paths = self.plan.paths();
        paths.push(self.list_file.clone());
        paths.push(self.video.clone());
        paths
    }
}

/// Renders subclips into `work_dir` and concatenates them.
pub struct TimelineCompiler<'a> {
    engine: &'a dyn MediaEngine,
    store: &'a dyn FileStore,
    logger: &'a RunLogger,
    profile: &'a EncodeProfile,
    work_dir: PathBuf,
    extension: String,
    progress: ItemProgress<'a>,
}

impl<'a> TimelineCompiler<'a> {
    pub fn new(
        engine: &'a dyn MediaEngine,
        store: &'a dyn FileStore,
        logger: &'a RunLogger,
        profile: &'a EncodeProfile,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            engine,
            store,
            logger,
            profile,
            work_dir: work_dir.into(),
            extension: "mov".to_string(),
            progress: &no_progress,
        }
    }

    /// Called after each subclip with milliseconds of timeline covered and total.
    pub fn with_progress(mut self, progress: ItemProgress<'a>) -> Self {
        self.progress = progress;
        self
    }

    /// Container extension for subclips and the compiled video.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Walk, render, and concatenate.
    ///
    /// The walk tolerates window tails rendered up to one frame short.
    /// On failure every file written by this call is deleted.
    pub fn compile<R: Rng + ?Sized>(
        &self,
        sources: &[TimelineSource],
        bounds: SubclipBounds,
        rng: &mut R,
    ) -> TimelineResult<CompiledVideo> {
        let bounds = if self.profile.fps > 0.0 {
            bounds.with_slack(1.0 / self.profile.fps)
        } else {
            bounds
        };
        let list_file = self.work_dir.join("concat_list.txt");
        let video = self.work_dir.join(format!("compiled.{}", self.extension));
        let mut written: Vec<PathBuf> = Vec::new();

        let result = self.render_and_join(sources, bounds, rng, &list_file, &video, &mut written);
        match result {
            Ok(plan) => Ok(CompiledVideo {
                plan,
                list_file,
                video,
            }),
            Err(e) => {
                written.push(list_file);
                written.push(video);
                let paths: Vec<&Path> = written.iter().map(PathBuf::as_path).collect();
                discard(self.store, self.logger, &paths);
                Err(e)
            }
        }
    }

    fn render_and_join<R: Rng + ?Sized>(
        &self,
        sources: &[TimelineSource],
        bounds: SubclipBounds,
        rng: &mut R,
        list_file: &Path,
        video: &Path,
        written: &mut Vec<PathBuf>,
    ) -> TimelineResult<CompilationPlan> {
        let total_ms = sources
            .iter()
            .filter_map(|s| s.window)
            .map(|w| (w.end_secs * 1000.0) as usize)
            .max()
            .unwrap_or(0);
        let mut covered_secs = 0.0;

        let plan = build_plan(sources, bounds, rng, |spec| {
            let relative = self
                .work_dir
                .join(format!("subclip_{:04}.{}", written.len(), self.extension));
            written.push(relative.clone());

            let absolute = self.store.absolute_path(&relative);
            let source = &sources[spec.source_index];
            let command = commands::subclip(
                &source.path,
                &absolute,
                spec.local_start_secs,
                spec.duration_secs,
                self.profile,
            );
            run_command(
                self.engine,
                self.logger,
                &format!("Render subclip {}", written.len()),
                &command,
            )?;

            let measured = self.engine.probe(&absolute)?.duration_secs;
            self.logger.debug(&format!(
                "Subclip {}: source {} from {:.3}s, requested {:.3}s, got {:.3}s",
                written.len(),
                spec.source_index + 1,
                spec.local_start_secs,
                spec.duration_secs,
                measured
            ));
            covered_secs += measured;
            (self.progress)(((covered_secs * 1000.0) as usize).min(total_ms), total_ms);
            Ok((relative, measured))
        })?;

        self.logger.info(&format!(
            "Rendered {} subclips covering {:.3}s",
            plan.len(),
            plan.measured_total_secs()
        ));

        let absolute_paths: Vec<PathBuf> = plan
            .paths()
            .iter()
            .map(|p| self.store.absolute_path(p))
            .collect();
        let list_contents = commands::concat_list_contents(&absolute_paths);
        let list_absolute = self.store.write_file(list_file, list_contents.as_bytes())?;

        let command = commands::concat(&list_absolute, &self.store.absolute_path(video));
        run_command(self.engine, self.logger, "Concatenate subclips", &command)?;

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::ScriptedEngine;
    use crate::logging::LogConfig;
    use crate::models::GlobalOffset;
    use crate::storage::LocalFileStore;
    use crate::timeline::TimelineError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::fs;
    use tempfile::tempdir;

    fn sources() -> Vec<TimelineSource> {
        vec![
            TimelineSource {
                path: PathBuf::from("/clips/a.mov"),
                weight: 1.0,
                window: Some(GlobalOffset::new(0.0, 20.0)),
            },
            TimelineSource {
                path: PathBuf::from("/clips/b.mov"),
                weight: 1.0,
                window: Some(GlobalOffset::new(5.0, 25.0)),
            },
        ]
    }

    #[test]
    fn compiles_and_concatenates() {
        let dir = tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        store.make_directory(Path::new("run")).unwrap();
        let engine = ScriptedEngine::new();
        let logger = RunLogger::detached("t", LogConfig::default());
        let profile = EncodeProfile::default();
        let compiler = TimelineCompiler::new(&engine, &store, &logger, &profile, "run");
        let mut rng = StdRng::seed_from_u64(4);

        let compiled = compiler
            .compile(&sources(), SubclipBounds::new(4.0, 6.0), &mut rng)
            .unwrap();

        assert_eq!(compiled.video, PathBuf::from("run/compiled.mov"));
        assert!((compiled.plan.measured_total_secs() - 25.0).abs() < 0.01);

        let list = fs::read_to_string(dir.path().join("run/concat_list.txt")).unwrap();
        assert_eq!(list.lines().count(), compiled.plan.len());
        assert!(list.starts_with("file '"));

        let commands = engine.commands();
        let concat = commands.last().unwrap();
        assert_eq!(concat.value_of("-f"), Some("concat"));
        assert!(compiled.artifacts().iter().all(|p| store.exists(p)));
    }

    #[test]
    fn short_renders_shift_later_subclips() {
        let dir = tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        store.make_directory(Path::new("run")).unwrap();
        let engine = ScriptedEngine::new().with_shortfall(0.01);
        let logger = RunLogger::detached("t", LogConfig::default());
        let profile = EncodeProfile::default();
        let reports = parking_lot::Mutex::new(Vec::new());
        let record = |done: usize, total: usize| reports.lock().push((done, total));
        let compiler =
            TimelineCompiler::new(&engine, &store, &logger, &profile, "run").with_progress(&record);
        let mut rng = StdRng::seed_from_u64(4);

        let compiled = compiler
            .compile(&sources(), SubclipBounds::new(4.0, 6.0), &mut rng)
            .unwrap();

        let subclips = &compiled.plan.subclips;
        assert!(subclips.len() >= 4);
        // Commands carry millisecond timestamps.
        for sub in subclips {
            assert!((sub.measured_secs - (sub.spec.duration_secs - 0.01)).abs() < 1e-3);
        }
        for pair in subclips.windows(2) {
            let expected = pair[0].global_start_secs + pair[0].measured_secs;
            assert!((pair[1].global_start_secs - expected).abs() < 1e-9);
        }
        let last = subclips.last().unwrap();
        assert!(last.global_start_secs + last.measured_secs <= 25.0);

        let reports = reports.lock();
        assert_eq!(reports.len(), subclips.len());
        assert!(reports.iter().all(|&(_, total)| total == 25_000));
        assert!(reports.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn shortfall_past_one_frame_fails_and_cleans_up() {
        let dir = tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        store.make_directory(Path::new("run")).unwrap();
        let engine = ScriptedEngine::new().with_shortfall(0.25);
        let logger = RunLogger::detached("t", LogConfig::default());
        let profile = EncodeProfile::default();
        let compiler = TimelineCompiler::new(&engine, &store, &logger, &profile, "run");
        let mut rng = StdRng::seed_from_u64(4);
        let mut sources = sources();
        sources[0].window = Some(GlobalOffset::new(0.0, 5.0));
        sources[1].window = Some(GlobalOffset::new(0.0, 4.0));

        let err = compiler
            .compile(&sources, SubclipBounds::new(4.0, 6.0), &mut rng)
            .unwrap_err();

        match err {
            TimelineError::RenderShortfall { at_secs, gap_secs } => {
                assert!((at_secs - 4.75).abs() < 1e-6);
                assert!((gap_secs - 0.25).abs() < 1e-6);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs::read_dir(dir.path().join("run")).unwrap().count(), 0);
    }

    #[test]
    fn failure_removes_rendered_subclips() {
        let dir = tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        store.make_directory(Path::new("run")).unwrap();
        let engine = ScriptedEngine::new().fail_on("subclip_0002", true);
        let logger = RunLogger::detached("t", LogConfig::default());
        let profile = EncodeProfile::default();
        let compiler = TimelineCompiler::new(&engine, &store, &logger, &profile, "run");
        let mut rng = StdRng::seed_from_u64(4);

        let err = compiler
            .compile(&sources(), SubclipBounds::new(4.0, 6.0), &mut rng)
            .unwrap_err();

        match err {
            TimelineError::Engine(failed) => assert!(failed.diagnostic.contains("Conversion failed")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs::read_dir(dir.path().join("run")).unwrap().count(), 0);
    }
}
