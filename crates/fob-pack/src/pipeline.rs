//! Per-unit plugin pipelines.
//!
//! A pipeline is three segments concatenated at build time: caller plugins
//! that run before the defaults, the defaults themselves, and caller plugins
//! that run after. The defaults always keep the relative order
//! resolve → replace → transpile → json, whichever of them are enabled.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use rolldown_plugin::Plugin;
use rolldown_plugin::__inner::SharedPluginable;
use serde::{Deserialize, Serialize};

/// `true`/`false` or a full options object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Toggle<T> {
    Bool(bool),
    Options(T),
}

impl<T: Clone + Default> Toggle<T> {
    /// Options when enabled, `None` when switched off.
    pub fn enabled(&self) -> Option<T> {
        match self {
            Toggle::Bool(true) => Some(T::default()),
            Toggle::Bool(false) => None,
            Toggle::Options(options) => Some(options.clone()),
        }
    }
}

/// Target platform for the transpile stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranspilePlatform {
    Node,
    Browser,
    Neutral,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranspileOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<TranspilePlatform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minify: Option<bool>,
    /// tsconfig used for path aliases, relative to the project root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tsconfig: Option<String>,
}

impl TranspileOptions {
    fn merged_over(&self, base: &TranspileOptions) -> TranspileOptions {
        TranspileOptions {
            platform: self.platform.or(base.platform),
            minify: self.minify.or(base.minify),
            tsconfig: self.tsconfig.clone().or_else(|| base.tsconfig.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceOptions {
    #[serde(default)]
    pub values: IndexMap<String, String>,
    /// Skip matches that are the target of an assignment.
    #[serde(default = "default_prevent_assignment")]
    pub prevent_assignment: bool,
}

fn default_prevent_assignment() -> bool {
    true
}

impl Default for ReplaceOptions {
    fn default() -> Self {
        Self {
            values: IndexMap::new(),
            prevent_assignment: default_prevent_assignment(),
        }
    }
}

impl ReplaceOptions {
    fn merged_over(&self, base: &ReplaceOptions) -> ReplaceOptions {
        let mut values = base.values.clone();
        values.extend(self.values.iter().map(|(k, v)| (k.clone(), v.clone())));
        ReplaceOptions {
            values,
            prevent_assignment: self.prevent_assignment,
        }
    }
}

/// node_modules resolution settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResolveOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_conditions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_fields: Option<Vec<String>>,
    /// Prefer the `browser` field and conditions.
    #[serde(default)]
    pub browser: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonOptions {
    /// Strip whitespace from inlined JSON.
    #[serde(default)]
    pub compact: bool,
}

/// Declaration emit settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DtsOptions {
    /// Drop declarations tagged `@internal`.
    #[serde(default)]
    pub strip_internal: bool,
}

/// A caller-supplied engine plugin.
#[derive(Clone)]
pub struct CustomPlugin {
    name: String,
    plugin: SharedPluginable,
}

impl CustomPlugin {
    pub fn new<P: Plugin + 'static>(plugin: P) -> Self {
        Self {
            name: plugin.name().into_owned(),
            plugin: Arc::new(plugin),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shared(&self) -> SharedPluginable {
        Arc::clone(&self.plugin)
    }
}

impl fmt::Debug for CustomPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomPlugin").field(&self.name).finish()
    }
}

impl PartialEq for CustomPlugin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.plugin, &other.plugin)
    }
}

impl Eq for CustomPlugin {}

/// Caller plugins added around the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtraPlugins {
    /// Appended after the defaults.
    Append(Vec<CustomPlugin>),
    /// `start` runs before every default, `end` after.
    Around {
        start: Vec<CustomPlugin>,
        end: Vec<CustomPlugin>,
    },
}

impl Default for ExtraPlugins {
    fn default() -> Self {
        ExtraPlugins::Append(Vec::new())
    }
}

impl ExtraPlugins {
    pub fn is_empty(&self) -> bool {
        match self {
            ExtraPlugins::Append(list) => list.is_empty(),
            ExtraPlugins::Around { start, end } => start.is_empty() && end.is_empty(),
        }
    }
}

/// Plugin options of one scope (global, exports, bin or entry).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transpile: Option<TranspileOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace: Option<ReplaceOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolve: Option<Toggle<NodeResolveOptions>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<Toggle<JsonOptions>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dts: Option<DtsOptions>,
    /// Engine plugins; only settable from Rust.
    #[serde(skip)]
    pub extra: ExtraPlugins,
}

/// Ordering of the default stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Resolve = 0,
    Replace = 10,
    Transpile = 20,
    Json = 30,
}

/// One pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelinePlugin {
    Resolve(NodeResolveOptions),
    Replace(ReplaceOptions),
    Transpile(TranspileOptions),
    Json(JsonOptions),
    Declarations(DtsOptions),
    Custom(CustomPlugin),
}

impl PipelinePlugin {
    pub fn name(&self) -> &str {
        match self {
            PipelinePlugin::Resolve(_) => "resolve",
            PipelinePlugin::Replace(_) => "replace",
            PipelinePlugin::Transpile(_) => "transpile",
            PipelinePlugin::Json(_) => "json",
            PipelinePlugin::Declarations(_) => "declarations",
            PipelinePlugin::Custom(plugin) => plugin.name(),
        }
    }

    fn stage(&self) -> Option<Stage> {
        match self {
            PipelinePlugin::Resolve(_) => Some(Stage::Resolve),
            PipelinePlugin::Replace(_) => Some(Stage::Replace),
            PipelinePlugin::Transpile(_) => Some(Stage::Transpile),
            PipelinePlugin::Json(_) => Some(Stage::Json),
            PipelinePlugin::Declarations(_) | PipelinePlugin::Custom(_) => None,
        }
    }
}

/// The ordered plugin list of one build unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    prefix: Vec<PipelinePlugin>,
    defaults: Vec<PipelinePlugin>,
    suffix: Vec<PipelinePlugin>,
}

impl Pipeline {
    /// All stages in execution order.
    pub fn plugins(&self) -> impl Iterator<Item = &PipelinePlugin> {
        self.prefix
            .iter()
            .chain(self.defaults.iter())
            .chain(self.suffix.iter())
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins().map(PipelinePlugin::name).collect()
    }

    pub fn is_declaration(&self) -> bool {
        self.defaults
            .iter()
            .any(|p| matches!(p, PipelinePlugin::Declarations(_)))
    }

    pub fn transpile(&self) -> Option<&TranspileOptions> {
        self.defaults.iter().find_map(|p| match p {
            PipelinePlugin::Transpile(options) => Some(options),
            _ => None,
        })
    }

    pub fn resolve(&self) -> Option<&NodeResolveOptions> {
        self.defaults.iter().find_map(|p| match p {
            PipelinePlugin::Resolve(options) => Some(options),
            _ => None,
        })
    }

    pub fn declarations(&self) -> Option<&DtsOptions> {
        self.defaults.iter().find_map(|p| match p {
            PipelinePlugin::Declarations(options) => Some(options),
            _ => None,
        })
    }
}

/// Build the transpile pipeline for a scope; scope options win over global.
pub fn build_pipeline(scope: &PluginOptions, global: &PluginOptions) -> Pipeline {
    let mut defaults = Vec::with_capacity(4);

    let transpile = match (&scope.transpile, &global.transpile) {
        (Some(s), Some(g)) => s.merged_over(g),
        (Some(s), None) => s.clone(),
        (None, Some(g)) => g.clone(),
        (None, None) => TranspileOptions::default(),
    };
    defaults.push(PipelinePlugin::Transpile(transpile));

    let replace = match (&scope.replace, &global.replace) {
        (Some(s), Some(g)) => Some(s.merged_over(g)),
        (s, g) => s.clone().or_else(|| g.clone()),
    };
    if let Some(replace) = replace {
        defaults.push(PipelinePlugin::Replace(replace));
    }

    if let Some(resolve) = scope
        .resolve
        .as_ref()
        .or(global.resolve.as_ref())
        .and_then(Toggle::enabled)
    {
        defaults.push(PipelinePlugin::Resolve(resolve));
    }

    if let Some(json) = scope
        .json
        .as_ref()
        .or(global.json.as_ref())
        .and_then(Toggle::enabled)
    {
        defaults.push(PipelinePlugin::Json(json));
    }

    defaults.sort_by_key(|p| p.stage());

    let extra = if scope.extra.is_empty() {
        &global.extra
    } else {
        &scope.extra
    };
    let (prefix, suffix) = match extra {
        ExtraPlugins::Append(list) => (Vec::new(), custom(list)),
        ExtraPlugins::Around { start, end } => (custom(start), custom(end)),
    };

    Pipeline {
        prefix,
        defaults,
        suffix,
    }
}

/// The declaration-only pipeline: a single declaration stage.
pub fn build_declaration_pipeline(scope: &PluginOptions, global: &PluginOptions) -> Pipeline {
    let dts = scope
        .dts
        .clone()
        .or_else(|| global.dts.clone())
        .unwrap_or_default();
    Pipeline {
        prefix: Vec::new(),
        defaults: vec![PipelinePlugin::Declarations(dts)],
        suffix: Vec::new(),
    }
}

fn custom(list: &[CustomPlugin]) -> Vec<PipelinePlugin> {
    list.iter().cloned().map(PipelinePlugin::Custom).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[derive(Debug)]
    struct Named(&'static str);

    impl Plugin for Named {
        fn name(&self) -> Cow<'static, str> {
            self.0.into()
        }

        fn register_hook_usage(&self) -> rolldown_plugin::HookUsage {
            rolldown_plugin::HookUsage::empty()
        }
    }

    fn all_requested() -> PluginOptions {
        PluginOptions {
            replace: Some(ReplaceOptions::default()),
            resolve: Some(Toggle::Bool(true)),
            json: Some(Toggle::Bool(true)),
            ..Default::default()
        }
    }

    #[test]
    fn test_baseline_is_transpile_only() {
        let p = build_pipeline(&PluginOptions::default(), &PluginOptions::default());
        assert_eq!(p.names(), vec!["transpile"]);
    }

    #[test]
    fn test_full_order() {
        let p = build_pipeline(&all_requested(), &PluginOptions::default());
        assert_eq!(p.names(), vec!["resolve", "replace", "transpile", "json"]);
    }

    #[test]
    fn test_relative_order_is_stable_for_every_combination() {
        let canonical = ["resolve", "replace", "transpile", "json"];
        for mask in 0..8u8 {
            let scope = PluginOptions {
                resolve: (mask & 1 != 0).then_some(Toggle::Bool(true)),
                replace: (mask & 2 != 0).then(ReplaceOptions::default),
                json: (mask & 4 != 0).then_some(Toggle::Bool(true)),
                ..Default::default()
            };
            let pipeline = build_pipeline(&scope, &PluginOptions::default());
            let names = pipeline.names();
            let positions: Vec<usize> = names
                .iter()
                .map(|n| canonical.iter().position(|c| c == n).unwrap())
                .collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]), "{names:?}");
            assert!(names.contains(&"transpile"));
        }
    }

    #[test]
    fn test_scope_false_disables_global() {
        let global = all_requested();
        let scope = PluginOptions {
            json: Some(Toggle::Bool(false)),
            ..Default::default()
        };
        let p = build_pipeline(&scope, &global);
        assert_eq!(p.names(), vec!["resolve", "replace", "transpile"]);
    }

    #[test]
    fn test_scope_transpile_merges_over_global() {
        let global = PluginOptions {
            transpile: Some(TranspileOptions {
                platform: Some(TranspilePlatform::Browser),
                minify: Some(false),
                tsconfig: Some("tsconfig.build.json".into()),
            }),
            ..Default::default()
        };
        let scope = PluginOptions {
            transpile: Some(TranspileOptions {
                minify: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        let p = build_pipeline(&scope, &global);
        let t = p.transpile().unwrap();
        assert_eq!(t.minify, Some(true));
        assert_eq!(t.platform, Some(TranspilePlatform::Browser));
        assert_eq!(t.tsconfig.as_deref(), Some("tsconfig.build.json"));
    }

    #[test]
    fn test_replace_values_merge() {
        let mut g = ReplaceOptions::default();
        g.values.insert("A".into(), "1".into());
        g.values.insert("B".into(), "2".into());
        let mut s = ReplaceOptions::default();
        s.values.insert("B".into(), "3".into());
        let merged = s.merged_over(&g);
        assert_eq!(merged.values["A"], "1");
        assert_eq!(merged.values["B"], "3");
    }

    #[test]
    fn test_flat_extras_are_appended() {
        let scope = PluginOptions {
            json: Some(Toggle::Bool(true)),
            extra: ExtraPlugins::Append(vec![CustomPlugin::new(Named("banner"))]),
            ..Default::default()
        };
        let p = build_pipeline(&scope, &PluginOptions::default());
        assert_eq!(p.names(), vec!["transpile", "json", "banner"]);
    }

    #[test]
    fn test_start_end_wrap_defaults() {
        let scope = PluginOptions {
            resolve: Some(Toggle::Bool(true)),
            replace: Some(ReplaceOptions::default()),
            extra: ExtraPlugins::Around {
                start: vec![CustomPlugin::new(Named("first"))],
                end: vec![CustomPlugin::new(Named("last"))],
            },
            ..Default::default()
        };
        let p = build_pipeline(&scope, &PluginOptions::default());
        assert_eq!(
            p.names(),
            vec!["first", "resolve", "replace", "transpile", "last"]
        );
    }

    #[test]
    fn test_declaration_pipeline_is_isolated() {
        let mut scope = all_requested();
        scope.transpile = Some(TranspileOptions {
            minify: Some(true),
            ..Default::default()
        });
        scope.extra = ExtraPlugins::Append(vec![CustomPlugin::new(Named("x"))]);
        let p = build_declaration_pipeline(&scope, &PluginOptions::default());
        assert_eq!(p.names(), vec!["declarations"]);
        assert!(p.is_declaration());
        assert!(p.transpile().is_none());
    }

    #[test]
    fn test_toggle_deserialization() {
        let opts: PluginOptions =
            serde_json::from_str(r#"{ "json": true, "resolve": { "browser": true } }"#).unwrap();
        assert_eq!(opts.json, Some(Toggle::Bool(true)));
        assert!(matches!(opts.resolve, Some(Toggle::Options(ref r)) if r.browser));
    }
}
