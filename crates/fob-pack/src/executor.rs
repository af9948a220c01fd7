//! Build plan execution.
//!
//! Phases run strictly in order (exports, binaries, explicit entries) and
//! units within a phase run one at a time: plan, bundle, write, stat. The
//! first failing unit aborts the run; files already written stay on disk.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use path_clean::PathClean;

use crate::config::{BuildConfiguration, ExportsMatcher, ExternalPattern};
use crate::engine::{BundleEngine, BundleRequest, EngineLog, Format, LogCallback, WriteOptions};
use crate::error::{Error, Result};
use crate::hooks::{HookPoint, run_hook};
use crate::log_filter::LogFilter;
use crate::pipeline::{Pipeline, build_declaration_pipeline, build_pipeline};
use crate::plan::inference::infer_input_path;
use crate::plan::target::{TargetField, is_declaration_path, is_path_allowed};
use crate::stats::{BundleStats, StatsReporter};

/// First line of every binary output.
pub const SHEBANG: &str = "#!/usr/bin/env node";

/// Execution phases, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Exports,
    Binary,
    Entries,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Exports, Phase::Binary, Phase::Entries];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Exports => "exports",
            Phase::Binary => "bin",
            Phase::Entries => "entries",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One engine invocation: a single input written to a single output.
#[derive(Debug, Clone)]
pub struct BuildUnit {
    pub phase: Phase,
    /// Export key, binary name or entry output.
    pub label: String,
    /// Target field for export units.
    pub field: Option<TargetField>,
    pub format: Format,
    pub input: PathBuf,
    /// Output path as declared, relative to the root.
    pub output: String,
    pub pipeline: Pipeline,
    pub externals: Vec<ExternalPattern>,
    pub banner: Option<String>,
    pub footer: Option<String>,
    pub log_filter: Vec<String>,
    /// Mark the output executable after writing.
    pub executable: bool,
}

impl BuildUnit {
    pub fn is_declaration(&self) -> bool {
        self.pipeline.is_declaration()
    }

    fn describe(&self) -> String {
        match self.field {
            Some(field) => format!("{} {} ({})", self.phase, self.label, field.as_str()),
            None => format!("{} {}", self.phase, self.label),
        }
    }
}

/// Outcome of one written unit.
#[derive(Debug, Clone)]
pub struct UnitReport {
    pub phase: Phase,
    pub label: String,
    pub output: String,
    pub format: Format,
    pub declaration: bool,
    /// Size of the written file.
    pub bytes: u64,
    /// Engine logs that passed the unit's filter, in emission order.
    pub logs: Vec<EngineLog>,
}

/// Result of a complete run.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub stats: BundleStats,
    pub units: Vec<UnitReport>,
}

/// Progress notifications, in order.
#[derive(Debug)]
pub enum BuildEvent<'a> {
    PhaseStarted { phase: Phase, units: usize },
    UnitWritten(&'a UnitReport),
    Finished(&'a BundleStats),
}

/// Receives [`BuildEvent`]s as the run progresses.
pub trait BuildObserver: Send + Sync {
    fn on_event(&self, event: BuildEvent<'_>);
}

/// Ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl BuildObserver for NoopObserver {
    fn on_event(&self, _event: BuildEvent<'_>) {}
}

/// Runs a [`BuildConfiguration`] through a [`BundleEngine`].
pub struct BuildPlanExecutor<E> {
    engine: E,
    observer: Arc<dyn BuildObserver>,
}

impl<E: BundleEngine> BuildPlanExecutor<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: impl BuildObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Every unit the configuration describes, in execution order.
    pub async fn plan(&self, config: &BuildConfiguration) -> Vec<BuildUnit> {
        let mut units = Vec::new();
        for phase in Phase::ALL {
            units.extend(plan_phase(config, phase).await);
        }
        units
    }

    /// Build everything, hooks included.
    ///
    /// # Errors
    ///
    /// The first unit whose bundle or write fails aborts the run with
    /// [`Error::BuildUnit`]; a failing `buildStart`/`buildEnd` hook aborts
    /// with [`Error::Hook`].
    pub async fn execute(&self, config: &BuildConfiguration) -> Result<BuildReport> {
        run_hook(&config.root, &config.hooks, HookPoint::BuildStart).await?;

        let mut stats = StatsReporter::start();
        let mut reports = Vec::new();

        for phase in Phase::ALL {
            // Planned lazily so each phase sees the disk as earlier phases
            // left it.
            let units = plan_phase(config, phase).await;
            if units.is_empty() {
                tracing::debug!(phase = %phase, "Nothing to build");
                continue;
            }

            tracing::info!(phase = %phase, units = units.len(), "Building phase");
            self.observer.on_event(BuildEvent::PhaseStarted {
                phase,
                units: units.len(),
            });

            for unit in units {
                let report = self.run_unit(&config.root, unit).await?;
                stats.record(report.bytes);
                self.observer.on_event(BuildEvent::UnitWritten(&report));
                reports.push(report);
            }
        }

        run_hook(&config.root, &config.hooks, HookPoint::BuildEnd).await?;

        let stats = stats.finish();
        tracing::info!(
            units = stats.unit_count,
            bytes = stats.total_bytes,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "Build finished"
        );
        self.observer.on_event(BuildEvent::Finished(&stats));

        Ok(BuildReport {
            stats,
            units: reports,
        })
    }

    async fn run_unit(&self, root: &Path, unit: BuildUnit) -> Result<UnitReport> {
        tracing::debug!(
            unit = %unit.describe(),
            input = %unit.input.display(),
            format = %unit.format,
            pipeline = ?unit.pipeline.names(),
            "Bundling unit"
        );

        let filter = LogFilter::new(&unit.log_filter);
        let logs = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&logs);
        let on_log: LogCallback = Arc::new(move |log: EngineLog| {
            if filter.keep(&log) {
                sink.lock().push(log);
            }
        });

        let fail = |reason: String| Error::BuildUnit {
            unit: unit.describe(),
            input: unit.input.clone(),
            reason,
        };

        let request = BundleRequest {
            cwd: root.to_path_buf(),
            input: unit.input.clone(),
            pipeline: unit.pipeline.clone(),
            externals: unit.externals.clone(),
            on_log,
        };
        let file = root.join(&unit.output).clean();

        let mut graph = self
            .engine
            .bundle(request)
            .await
            .map_err(|e| fail(format!("{e:#}")))?;
        graph
            .write(&WriteOptions {
                file: file.clone(),
                format: unit.format,
                banner: unit.banner.clone(),
                footer: unit.footer.clone(),
            })
            .await
            .map_err(|e| fail(format!("{e:#}")))?;
        drop(graph);

        if unit.executable {
            make_executable(&file)
                .await
                .map_err(|e| fail(format!("failed to make {} executable: {e}", file.display())))?;
        }

        let bytes = tokio::fs::metadata(&file)
            .await
            .map_err(|e| fail(format!("failed to stat {}: {e}", file.display())))?
            .len();

        let logs = std::mem::take(&mut *logs.lock());
        for log in &logs {
            tracing::debug!(
                unit = %unit.describe(),
                code = log.code.as_deref().unwrap_or(""),
                "{}",
                log.message
            );
        }

        Ok(UnitReport {
            phase: unit.phase,
            declaration: unit.is_declaration(),
            label: unit.label,
            output: unit.output,
            format: unit.format,
            bytes,
            logs,
        })
    }
}

async fn plan_phase(config: &BuildConfiguration, phase: Phase) -> Vec<BuildUnit> {
    match phase {
        Phase::Exports => plan_exports(config).await,
        Phase::Binary => plan_bin(config).await,
        Phase::Entries => plan_entries(config),
    }
}

fn field_matcher(matcher: &ExportsMatcher, field: TargetField) -> Option<&str> {
    let specific = match field {
        TargetField::Types => matcher.types.as_deref(),
        TargetField::Import => matcher.import.as_deref(),
        TargetField::Require => matcher.require.as_deref(),
    };
    specific.or(matcher.default.as_deref())
}

async fn plan_exports(config: &BuildConfiguration) -> Vec<BuildUnit> {
    let Some(exports) = &config.exports else {
        return Vec::new();
    };
    let settings = &exports.settings;
    let mut units = Vec::new();

    for (key, target) in &exports.targets {
        for (field, output) in target.outputs() {
            let allowed = match field {
                TargetField::Types => is_declaration_path(output),
                TargetField::Import | TargetField::Require => is_path_allowed(output),
            };
            if !allowed {
                tracing::warn!(
                    export = %key,
                    field = field.as_str(),
                    output,
                    "Skipping export output with an unsupported path"
                );
                continue;
            }

            let input = infer_input_path(
                &config.root,
                &settings.source_root,
                output,
                field_matcher(&exports.matcher, field),
            )
            .await;

            let (format, pipeline) = match field {
                TargetField::Types => (
                    Format::Esm,
                    build_declaration_pipeline(&settings.plugins, &config.plugins),
                ),
                TargetField::Import => (
                    Format::Esm,
                    build_pipeline(&settings.plugins, &config.plugins),
                ),
                TargetField::Require => (
                    Format::Cjs,
                    build_pipeline(&settings.plugins, &config.plugins),
                ),
            };

            units.push(BuildUnit {
                phase: Phase::Exports,
                label: key.clone(),
                field: Some(field),
                format,
                input,
                output: output.to_string(),
                pipeline,
                externals: settings.externals.clone(),
                banner: None,
                footer: None,
                log_filter: settings.log_filter.clone(),
                executable: false,
            });
        }
    }
    units
}

async fn plan_bin(config: &BuildConfiguration) -> Vec<BuildUnit> {
    let Some(bin) = &config.bin else {
        return Vec::new();
    };
    let settings = &bin.settings;
    let mut units = Vec::new();

    for (name, output) in bin.targets.entries() {
        if !is_path_allowed(output) {
            tracing::warn!(bin = name, output, "Skipping binary with an unsupported path");
            continue;
        }

        let input = infer_input_path(
            &config.root,
            &settings.source_root,
            output,
            bin.matcher.as_deref(),
        )
        .await;

        units.push(BuildUnit {
            phase: Phase::Binary,
            label: name.to_string(),
            field: None,
            format: Format::from_output_path(output),
            input,
            output: output.to_string(),
            pipeline: build_pipeline(&settings.plugins, &config.plugins),
            externals: settings.externals.clone(),
            banner: Some(SHEBANG.to_string()),
            footer: None,
            log_filter: settings.log_filter.clone(),
            executable: true,
        });
    }
    units
}

fn plan_entries(config: &BuildConfiguration) -> Vec<BuildUnit> {
    config
        .entries
        .iter()
        .map(|entry| {
            let settings = &entry.settings;
            let pipeline = if is_declaration_path(&entry.output) {
                build_declaration_pipeline(&settings.plugins, &config.plugins)
            } else {
                build_pipeline(&settings.plugins, &config.plugins)
            };
            BuildUnit {
                phase: Phase::Entries,
                label: entry.output.clone(),
                field: None,
                format: entry.format,
                input: config.root.join(&entry.input).clean(),
                output: entry.output.clone(),
                pipeline,
                externals: settings.externals.clone(),
                banner: entry.banner.clone(),
                footer: entry.footer.clone(),
                log_filter: settings.log_filter.clone(),
                executable: false,
            }
        })
        .collect()
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_matcher_falls_back_to_default() {
        let matcher = ExportsMatcher {
            default: Some("main.ts".into()),
            types: Some("types.ts".into()),
            ..Default::default()
        };
        assert_eq!(field_matcher(&matcher, TargetField::Types), Some("types.ts"));
        assert_eq!(field_matcher(&matcher, TargetField::Require), Some("main.ts"));
        assert_eq!(field_matcher(&ExportsMatcher::default(), TargetField::Import), None);
    }

    #[test]
    fn test_phase_order() {
        let names: Vec<&str> = Phase::ALL.iter().map(Phase::as_str).collect();
        assert_eq!(names, vec!["exports", "bin", "entries"]);
    }
}
