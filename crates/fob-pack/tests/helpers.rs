//! Shared test utilities for fob-pack tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use fob_pack::engine::{BundleGraph, BundleRequest, WriteOptions};
use fob_pack::executor::{BuildEvent, BuildObserver};
use fob_pack::{BundleEngine, EngineLog, Format};
use parking_lot::Mutex;
use tempfile::TempDir;

/// A throwaway project directory.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `content` to `relative`, creating parent directories.
    pub fn file(&self, relative: &str, content: &str) -> &Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
        self
    }

    pub fn manifest(&self, json: serde_json::Value) -> &Self {
        self.file("package.json", &serde_json::to_string_pretty(&json).unwrap())
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.dir.path().join(relative)).unwrap()
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.dir.path().join(relative).exists()
    }
}

/// One `bundle` + `write` pair seen by [`RecordingEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub input: PathBuf,
    pub pipeline: Vec<String>,
    pub declaration: bool,
    pub file: PathBuf,
    pub format: Format,
    pub banner: Option<String>,
    pub footer: Option<String>,
}

/// Engine double that writes a marker file per unit and records every call.
#[derive(Clone, Default)]
pub struct RecordingEngine {
    calls: Arc<Mutex<Vec<Call>>>,
    fail_on: Option<String>,
    logs: Vec<EngineLog>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `bundle` for inputs whose path contains `needle`.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    /// Raise `log` for every unit.
    pub fn emitting(mut self, log: EngineLog) -> Self {
        self.logs.push(log);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl BundleEngine for RecordingEngine {
    async fn bundle(&self, request: BundleRequest) -> anyhow::Result<Box<dyn BundleGraph>> {
        if let Some(needle) = &self.fail_on {
            if request.input.to_string_lossy().contains(needle.as_str()) {
                anyhow::bail!("cannot bundle {}", request.input.display());
            }
        }
        for log in &self.logs {
            (request.on_log)(log.clone());
        }
        Ok(Box::new(RecordingGraph {
            calls: Arc::clone(&self.calls),
            input: request.input.clone(),
            pipeline: request
                .pipeline
                .names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            declaration: request.pipeline.is_declaration(),
        }))
    }
}

struct RecordingGraph {
    calls: Arc<Mutex<Vec<Call>>>,
    input: PathBuf,
    pipeline: Vec<String>,
    declaration: bool,
}

#[async_trait]
impl BundleGraph for RecordingGraph {
    async fn write(&mut self, options: &WriteOptions) -> anyhow::Result<()> {
        let mut content = String::new();
        if let Some(banner) = &options.banner {
            content.push_str(banner);
            content.push('\n');
        }
        content.push_str(&format!("// {} ({})\n", self.input.display(), options.format));
        if let Some(parent) = options.file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&options.file, content)?;

        self.calls.lock().push(Call {
            input: self.input.clone(),
            pipeline: self.pipeline.clone(),
            declaration: self.declaration,
            file: options.file.clone(),
            format: options.format,
            banner: options.banner.clone(),
            footer: options.footer.clone(),
        });
        Ok(())
    }
}

/// Observer that records a one-line summary of every event.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl BuildObserver for EventLog {
    fn on_event(&self, event: BuildEvent<'_>) {
        let line = match event {
            BuildEvent::PhaseStarted { phase, units } => format!("phase {phase} ({units})"),
            BuildEvent::UnitWritten(report) => format!("unit {}", report.output),
            BuildEvent::Finished(stats) => format!("finished {}", stats.unit_count),
        };
        self.events.lock().push(line);
    }
}
