//! Configuration resolution.
//!
//! Exactly one source supplies the user configuration, in this order:
//!
//! 1. `--config <file>` (must exist)
//! 2. a programmatic [`ConfigProvider`]
//! 3. `fob-pack.toml`, `fob-pack.json` or `fob-pack.yaml` in the root
//! 4. the `fobPack` field of `package.json`
//! 5. `exports`/`bin` of `package.json` alone ("auto")
//!
//! Anything else is [`Error::ConfigurationNotFound`].

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;
use path_clean::PathClean;

use super::defaults::{DEFAULT_SOURCE_ROOT, default_externals};
use super::provider::{
    ConfigProvider, FileConfigProvider, ManifestConfigProvider, auto_config, find_config_file,
};
use super::{
    BinOptions, BinPlan, BuildConfiguration, ConfigSource, EntryOptions, EntryPlan,
    ExportsOptions, ExportsPlan, ExternalPattern, ScopeSettings, UserConfig,
};
use crate::engine::Format;
use crate::error::{Error, Result};
use crate::log_filter::default_log_filter;
use crate::manifest::{MANIFEST_FILE, Manifest};
use crate::pipeline::{PluginOptions, Toggle};
use crate::plan::exclusion::{apply_bin_exclusions, apply_exclusions};
use crate::plan::target::{BinTargets, OutputTarget, TargetField};

/// Values taken from command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    /// Config file path, relative to the root unless absolute.
    pub config: Option<PathBuf>,
    pub minify: Option<bool>,
    pub tsconfig: Option<String>,
}

/// Resolves the [`BuildConfiguration`] of one project.
pub struct ConfigResolver {
    root: PathBuf,
    cli: CliOverrides,
    provider: Option<Box<dyn ConfigProvider>>,
}

impl ConfigResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cli: CliOverrides::default(),
            provider: None,
        }
    }

    pub fn with_cli(mut self, cli: CliOverrides) -> Self {
        self.cli = cli;
        self
    }

    /// Use `provider` instead of probing for config files.
    pub fn with_provider(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.provider = Some(Box::new(provider));
        self
    }

    pub async fn resolve(&self) -> Result<BuildConfiguration> {
        let manifest = Manifest::load(&self.root).await?;
        let (source, user) = self.load_user_config(&manifest).await?;
        tracing::info!(source = %source, "Resolved configuration source");
        merge(&self.root, &manifest, user, &self.cli, source)
    }

    async fn load_user_config(&self, manifest: &Manifest) -> Result<(ConfigSource, UserConfig)> {
        if let Some(path) = &self.cli.config {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                self.root.join(path).clean()
            };
            let provider = FileConfigProvider::new(path).from_cli();
            return Ok((provider.source(), provider.load().await?));
        }

        if let Some(provider) = &self.provider {
            return Ok((provider.source(), provider.load().await?));
        }

        if let Some(path) = find_config_file(&self.root).await {
            let provider = FileConfigProvider::new(path);
            return Ok((provider.source(), provider.load().await?));
        }

        if let Some(value) = &manifest.fob_pack {
            let provider =
                ManifestConfigProvider::new(self.root.join(MANIFEST_FILE), value.clone());
            return Ok((provider.source(), provider.load().await?));
        }

        if manifest.declares_targets() {
            return Ok((ConfigSource::Auto, auto_config(&self.root)?));
        }

        Err(Error::ConfigurationNotFound {
            root: self.root.clone(),
        })
    }
}

/// Resolve the configuration of the project at `root`.
pub async fn resolve_config(root: &Path, cli: &CliOverrides) -> Result<BuildConfiguration> {
    ConfigResolver::new(root).with_cli(cli.clone()).resolve().await
}

/// Global values the per-scope cascade falls back to.
struct Cascade<'a> {
    cli: &'a CliOverrides,
    minify: Option<bool>,
    tsconfig: Option<&'a str>,
    source_root: &'a str,
    externals: &'a [ExternalPattern],
    log_filter: &'a [String],
}

impl Cascade<'_> {
    /// Scope value > CLI flag > global value; unset stays with the engine
    /// default.
    fn settings(
        &self,
        src_dir: Option<String>,
        externals: Option<Vec<ExternalPattern>>,
        log_filter: Option<Vec<String>>,
        minify: Option<bool>,
        tsconfig: Option<String>,
        plugins: &PluginOptions,
    ) -> ScopeSettings {
        let mut plugins = plugins.clone();
        let minify = minify.or(self.cli.minify).or(self.minify);
        let tsconfig = tsconfig
            .or_else(|| self.cli.tsconfig.clone())
            .or_else(|| self.tsconfig.map(str::to_string));
        if minify.is_some() || tsconfig.is_some() {
            let transpile = plugins.transpile.get_or_insert_with(Default::default);
            if minify.is_some() {
                transpile.minify = minify;
            }
            if tsconfig.is_some() {
                transpile.tsconfig = tsconfig;
            }
        }

        ScopeSettings {
            source_root: src_dir.unwrap_or_else(|| self.source_root.to_string()),
            externals: externals.unwrap_or_else(|| self.externals.to_vec()),
            log_filter: log_filter.unwrap_or_else(|| self.log_filter.to_vec()),
            plugins,
        }
    }
}

/// Merge the user configuration with the manifest and CLI overrides.
pub(crate) fn merge(
    root: &Path,
    manifest: &Manifest,
    user: UserConfig,
    cli: &CliOverrides,
    source: ConfigSource,
) -> Result<BuildConfiguration> {
    let source_root = user
        .src_dir
        .clone()
        .unwrap_or_else(|| DEFAULT_SOURCE_ROOT.to_string());

    let mut externals = default_externals(manifest);
    externals.extend(user.externals.clone().unwrap_or_default());
    let log_filter = user.log_filter.clone().unwrap_or_else(default_log_filter);

    let cascade = Cascade {
        cli,
        minify: user.minify,
        tsconfig: user.tsconfig.as_deref(),
        source_root: &source_root,
        externals: &externals,
        log_filter: &log_filter,
    };

    let entries = user
        .entries
        .clone()
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| resolve_entry(idx, entry, &cascade))
        .collect::<Result<Vec<_>>>()?;

    let claimed: HashSet<PathBuf> = entries
        .iter()
        .map(|e| Path::new(&e.output).clean())
        .collect();

    let exports = match &user.exports {
        Some(Toggle::Bool(false)) => None,
        Some(Toggle::Options(options)) => Some(options.clone()),
        Some(Toggle::Bool(true)) | None => Some(ExportsOptions::default()),
    }
    .filter(|_| manifest.exports.is_some())
    .map(|options| resolve_exports(manifest, options, &claimed, &cascade));

    let bin = match &user.bin {
        Some(Toggle::Bool(false)) => None,
        Some(Toggle::Options(options)) => Some(options.clone()),
        Some(Toggle::Bool(true)) | None => Some(BinOptions::default()),
    }
    .and_then(|options| {
        manifest
            .bin_targets()
            .map(|targets| resolve_bin(targets, options, &claimed, &cascade))
    });

    Ok(BuildConfiguration {
        source,
        root: root.to_path_buf(),
        source_root,
        exports,
        bin,
        entries,
        externals,
        log_filter,
        plugins: user.plugins,
        hooks: user.hooks,
    })
}

fn resolve_exports(
    manifest: &Manifest,
    options: ExportsOptions,
    claimed: &HashSet<PathBuf>,
    cascade: &Cascade<'_>,
) -> ExportsPlan {
    let mut targets = apply_exclusions(manifest.export_targets(), &options.exclude);
    release_claimed_exports(&mut targets, claimed);

    ExportsPlan {
        targets,
        matcher: options.matcher,
        exclusions: options.exclude,
        settings: cascade.settings(
            options.src_dir,
            options.externals,
            options.log_filter,
            options.minify,
            options.tsconfig,
            &options.plugins,
        ),
    }
}

fn resolve_bin(
    targets: BinTargets,
    options: BinOptions,
    claimed: &HashSet<PathBuf>,
    cascade: &Cascade<'_>,
) -> BinPlan {
    let mut targets = apply_bin_exclusions(targets, &options.exclude);
    let claimed_names: Vec<String> = targets
        .entries()
        .into_iter()
        .filter(|(_, path)| claimed.contains(&Path::new(path).clean()))
        .map(|(name, _)| name.to_string())
        .collect();
    if !claimed_names.is_empty() {
        tracing::debug!(names = ?claimed_names, "Binaries built by explicit entries");
        targets = apply_bin_exclusions(targets, &claimed_names);
    }

    BinPlan {
        targets,
        matcher: options.matcher,
        exclusions: options.exclude,
        settings: cascade.settings(
            options.src_dir,
            options.externals,
            options.log_filter,
            options.minify,
            options.tsconfig,
            &options.plugins,
        ),
    }
}

/// Explicit entries own their outputs; drop export fields that would build
/// the same file again.
fn release_claimed_exports(
    targets: &mut IndexMap<String, OutputTarget>,
    claimed: &HashSet<PathBuf>,
) {
    if claimed.is_empty() {
        return;
    }
    for (key, target) in targets.iter_mut() {
        let taken: Vec<TargetField> = target
            .outputs()
            .filter(|(_, path)| claimed.contains(&Path::new(path).clean()))
            .map(|(field, _)| field)
            .collect();
        for field in taken {
            tracing::debug!(key = %key, field = field.as_str(), "Export built by explicit entry");
            target.clear(field);
        }
    }
}

fn resolve_entry(idx: usize, entry: EntryOptions, cascade: &Cascade<'_>) -> Result<EntryPlan> {
    validate_entry_path(&format!("entries[{idx}].input"), &entry.input)?;
    validate_entry_path(&format!("entries[{idx}].output"), &entry.output)?;

    let format = entry
        .format
        .unwrap_or_else(|| Format::from_output_path(&entry.output));

    Ok(EntryPlan {
        format,
        banner: entry.banner,
        footer: entry.footer,
        settings: cascade.settings(
            None,
            entry.externals,
            entry.log_filter,
            entry.minify,
            entry.tsconfig,
            &entry.plugins,
        ),
        input: entry.input,
        output: entry.output,
    })
}

fn validate_entry_path(field: &str, value: &str) -> Result<()> {
    let path = Path::new(value);
    if value.is_empty() {
        return Err(Error::invalid(field, "\"\"", "Entry paths cannot be empty."));
    }
    if path.is_absolute() || path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(Error::invalid(
            field,
            value,
            "Entry paths must be relative to the project root and stay inside it.",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExportsMatcher, StaticConfigProvider};
    use crate::plan::exclusion::ExclusionRule;
    use serial_test::serial;
    use std::fs;

    const PKG: &str = r#"{
        "name": "pkg",
        "exports": {
            ".": { "types": "./dist/index.d.ts", "import": "./dist/index.mjs", "require": "./dist/index.cjs" },
            "./sub": { "import": "./dist/sub/index.mjs", "types": "./dist/sub/index.d.ts" }
        },
        "bin": { "pkg": "./dist/cli.mjs" },
        "dependencies": { "zod": "^3" }
    }"#;

    fn project(pkg: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), pkg).unwrap();
        dir
    }

    #[tokio::test]
    #[serial]
    async fn test_auto_mode_from_exports() {
        let dir = project(
            r#"{ "exports": { ".": { "import": "./dist/index.mjs", "types": "./dist/index.d.ts" } } }"#,
        );
        let config = resolve_config(dir.path(), &CliOverrides::default())
            .await
            .unwrap();
        assert_eq!(config.source, ConfigSource::Auto);
        assert_eq!(config.source_root, "src");
        assert_eq!(config.log_filter, vec!["!code:CIRCULAR_DEPENDENCY"]);
        let exports = config.exports.unwrap();
        assert_eq!(exports.targets.len(), 1);
        assert!(config.bin.is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_not_found() {
        let dir = project(r#"{ "name": "empty" }"#);
        let err = resolve_config(dir.path(), &CliOverrides::default()).await.unwrap_err();
        assert!(matches!(err, Error::ConfigurationNotFound { .. }));
    }

    #[tokio::test]
    #[serial]
    async fn test_manifest_field_over_auto() {
        let dir = project(r#"{ "exports": "./dist/index.mjs", "fobPack": { "srcDir": "lib" } }"#);
        let config = resolve_config(dir.path(), &CliOverrides::default()).await.unwrap();
        assert_eq!(config.source, ConfigSource::Manifest);
        assert_eq!(config.source_root, "lib");
    }

    #[tokio::test]
    #[serial]
    async fn test_config_file_over_manifest_field() {
        let dir = project(r#"{ "exports": "./dist/index.mjs", "fobPack": { "srcDir": "lib" } }"#);
        fs::write(dir.path().join("fob-pack.json"), r#"{ "srcDir": "source" }"#).unwrap();
        let config = resolve_config(dir.path(), &CliOverrides::default()).await.unwrap();
        assert!(matches!(config.source, ConfigSource::ConventionalFile(_)));
        assert_eq!(config.source_root, "source");
    }

    #[tokio::test]
    #[serial]
    async fn test_cli_path_wins_exclusively() {
        let dir = project(PKG);
        fs::write(dir.path().join("fob-pack.json"), r#"{ "srcDir": "conventional" }"#).unwrap();
        fs::write(dir.path().join("custom.toml"), "srcDir = \"custom\"\n").unwrap();

        let cli = CliOverrides {
            config: Some(PathBuf::from("custom.toml")),
            ..Default::default()
        };
        let config = resolve_config(dir.path(), &cli).await.unwrap();
        assert!(matches!(config.source, ConfigSource::CliFile(_)));
        assert_eq!(config.source_root, "custom");
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_cli_path_is_load_error() {
        let dir = project(PKG);
        fs::write(dir.path().join("fob-pack.json"), "{}").unwrap();
        let cli = CliOverrides {
            config: Some(PathBuf::from("missing.json")),
            ..Default::default()
        };
        let err = resolve_config(dir.path(), &cli).await.unwrap_err();
        assert!(matches!(err, Error::ConfigLoad { .. }));
    }

    #[tokio::test]
    #[serial]
    async fn test_programmatic_provider() {
        let dir = project(PKG);
        let user = UserConfig {
            src_dir: Some("app".into()),
            ..Default::default()
        };
        let config = ConfigResolver::new(dir.path())
            .with_provider(StaticConfigProvider::new(user))
            .resolve()
            .await
            .unwrap();
        assert_eq!(config.source, ConfigSource::Programmatic);
        assert_eq!(config.source_root, "app");
    }

    fn merge_user(user: UserConfig, cli: CliOverrides) -> Result<BuildConfiguration> {
        let manifest = Manifest::parse(PKG, "package.json").unwrap();
        merge(Path::new("/p"), &manifest, user, &cli, ConfigSource::Programmatic)
    }

    #[test]
    fn test_externals_additive_globally_and_replaced_per_scope() {
        let user = UserConfig {
            externals: Some(vec![ExternalPattern::Package("lodash".into())]),
            exports: Some(Toggle::Options(ExportsOptions {
                externals: Some(vec![ExternalPattern::Package("only-this".into())]),
                ..Default::default()
            })),
            ..Default::default()
        };
        let config = merge_user(user, CliOverrides::default()).unwrap();
        let global: Vec<String> = config.externals.iter().map(|e| e.to_string()).collect();
        assert_eq!(global, vec!["/^node:/", "/^rolldown/", "zod", "lodash"]);

        let exports = config.exports.unwrap();
        assert_eq!(exports.settings.externals.len(), 1);
        let bin = config.bin.unwrap();
        assert_eq!(bin.settings.externals, config.externals);
    }

    #[test]
    fn test_minify_cascade() {
        let user = UserConfig {
            minify: Some(false),
            exports: Some(Toggle::Options(ExportsOptions {
                minify: Some(false),
                ..Default::default()
            })),
            entries: Some(vec![EntryOptions {
                input: "./src/w.ts".into(),
                output: "./dist/w.mjs".into(),
                ..Default::default()
            }]),
            ..Default::default()
        };
        let cli = CliOverrides {
            minify: Some(true),
            ..Default::default()
        };
        let config = merge_user(user, cli).unwrap();

        let minify_of = |s: &ScopeSettings| s.plugins.transpile.as_ref().and_then(|t| t.minify);
        // scope beats CLI
        assert_eq!(minify_of(&config.exports.unwrap().settings), Some(false));
        // CLI beats global
        assert_eq!(minify_of(&config.bin.unwrap().settings), Some(true));
        assert_eq!(minify_of(&config.entries[0].settings), Some(true));
    }

    #[test]
    fn test_unset_cascade_leaves_engine_default() {
        let config = merge_user(UserConfig::default(), CliOverrides::default()).unwrap();
        assert!(config.exports.unwrap().settings.plugins.transpile.is_none());
    }

    #[test]
    fn test_tsconfig_cascade() {
        let user = UserConfig {
            tsconfig: Some("tsconfig.base.json".into()),
            bin: Some(Toggle::Options(BinOptions {
                tsconfig: Some("tsconfig.bin.json".into()),
                ..Default::default()
            })),
            ..Default::default()
        };
        let config = merge_user(user, CliOverrides::default()).unwrap();
        let tsconfig_of = |s: &ScopeSettings| {
            s.plugins
                .transpile
                .as_ref()
                .and_then(|t| t.tsconfig.clone())
        };
        assert_eq!(
            tsconfig_of(&config.bin.unwrap().settings).as_deref(),
            Some("tsconfig.bin.json")
        );
        assert_eq!(
            tsconfig_of(&config.exports.unwrap().settings).as_deref(),
            Some("tsconfig.base.json")
        );
    }

    #[test]
    fn test_exclusions_and_disabled_scopes() {
        let user = UserConfig {
            exports: Some(Toggle::Options(ExportsOptions {
                exclude: vec![ExclusionRule::Fields {
                    path: "./sub".into(),
                    types: true,
                    import: false,
                    require: false,
                }],
                matcher: ExportsMatcher {
                    types: Some("types.ts".into()),
                    ..Default::default()
                },
                ..Default::default()
            })),
            bin: Some(Toggle::Bool(false)),
            ..Default::default()
        };
        let config = merge_user(user, CliOverrides::default()).unwrap();
        let exports = config.exports.unwrap();
        assert!(exports.targets["./sub"].types.is_none());
        assert!(exports.targets["./sub"].import.is_some());
        assert_eq!(exports.matcher.types.as_deref(), Some("types.ts"));
        assert!(config.bin.is_none());
    }

    #[test]
    fn test_entries_claim_outputs() {
        let user = UserConfig {
            entries: Some(vec![
                EntryOptions {
                    input: "./src/custom.ts".into(),
                    output: "./dist/index.mjs".into(),
                    ..Default::default()
                },
                EntryOptions {
                    input: "./src/cli.ts".into(),
                    output: "dist/cli.mjs".into(),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        };
        let config = merge_user(user, CliOverrides::default()).unwrap();
        let exports = config.exports.unwrap();
        assert!(exports.targets["."].import.is_none());
        assert!(exports.targets["."].require.is_some());
        assert!(config.bin.unwrap().targets.is_empty());
    }

    #[test]
    fn test_entry_format_default_and_validation() {
        let user = UserConfig {
            entries: Some(vec![EntryOptions {
                input: "./src/a.ts".into(),
                output: "./dist/a.cjs".into(),
                ..Default::default()
            }]),
            ..Default::default()
        };
        let config = merge_user(user, CliOverrides::default()).unwrap();
        assert_eq!(config.entries[0].format, Format::Cjs);

        for bad in ["../outside.ts", "/abs/a.ts", ""] {
            let user = UserConfig {
                entries: Some(vec![EntryOptions {
                    input: bad.into(),
                    output: "./dist/a.mjs".into(),
                    ..Default::default()
                }]),
                ..Default::default()
            };
            let err = merge_user(user, CliOverrides::default()).unwrap_err();
            let field = match &err {
                Error::InvalidConfig { field, .. } => field.as_str(),
                _ => "",
            };
            assert_eq!(field, "entries[0].input", "{bad}: {err}");
        }
    }

    #[test]
    fn test_longest_output() {
        let config = merge_user(UserConfig::default(), CliOverrides::default()).unwrap();
        assert_eq!(config.longest_output(), "./dist/sub/index.d.ts".len());
    }
}
