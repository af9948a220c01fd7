use std::borrow::Cow;

use anyhow::Context;
use rolldown_common::ModuleType;
use rolldown_plugin::{
    HookLoadArgs, HookLoadOutput, HookLoadReturn, HookUsage, Plugin, PluginContext,
};

use crate::pipeline::JsonOptions;

/// How `.json` modules are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JsonMode {
    /// Inline as a JSON module, optionally with whitespace stripped.
    Inline { compact: bool },
    /// Refuse to load; JSON imports need the json stage.
    Reject,
}

impl From<Option<&JsonOptions>> for JsonMode {
    fn from(options: Option<&JsonOptions>) -> Self {
        match options {
            Some(options) => JsonMode::Inline {
                compact: options.compact,
            },
            None => JsonMode::Reject,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct JsonPlugin {
    mode: JsonMode,
}

impl JsonPlugin {
    pub(crate) fn new(mode: JsonMode) -> Self {
        Self { mode }
    }
}

fn is_json_module(id: &str) -> bool {
    id.ends_with(".json")
}

/// Validate `source` and optionally compact it.
pub(crate) fn load_json(source: &str, id: &str, compact: bool) -> anyhow::Result<String> {
    let value: serde_json::Value =
        serde_json::from_str(source).with_context(|| format!("Failed to parse JSON module {id}"))?;
    if compact {
        Ok(serde_json::to_string(&value)?)
    } else {
        Ok(source.to_string())
    }
}

impl Plugin for JsonPlugin {
    fn name(&self) -> Cow<'static, str> {
        "fob-pack:json".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::Load
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let id = args.id.to_string();
        let mode = self.mode;

        async move {
            if !is_json_module(&id) {
                return Ok(None);
            }

            let compact = match mode {
                JsonMode::Inline { compact } => compact,
                JsonMode::Reject => {
                    anyhow::bail!("Cannot import {id}: enable the json plugin to import JSON files")
                }
            };

            let source = tokio::fs::read_to_string(&id)
                .await
                .with_context(|| format!("Failed to read {id}"))?;
            let code = load_json(&source, &id, compact)?;

            Ok(Some(HookLoadOutput {
                code: code.into(),
                module_type: Some(ModuleType::Json),
                ..Default::default()
            }))
        }
    }
}
