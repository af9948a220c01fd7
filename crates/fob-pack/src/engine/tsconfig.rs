//! Path aliases from `compilerOptions.paths`.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use path_clean::PathClean;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TsConfig {
    #[serde(default)]
    compiler_options: CompilerOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompilerOptions {
    base_url: Option<String>,
    #[serde(default)]
    paths: IndexMap<String, Vec<String>>,
}

/// A resolver alias: bare key to absolute target directory or file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PathAlias {
    pub key: String,
    pub target: PathBuf,
}

/// The tsconfig used for a unit: the configured one, else
/// `<cwd>/tsconfig.json`.
pub(crate) fn tsconfig_path(cwd: &Path, configured: Option<&str>) -> PathBuf {
    match configured {
        Some(path) => cwd.join(path).clean(),
        None => cwd.join("tsconfig.json"),
    }
}

/// Read aliases from `path`. A missing or unparseable file yields none.
pub(crate) async fn read_aliases(path: &Path) -> Vec<PathAlias> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(_) => return Vec::new(),
    };
    let dir = path.parent().unwrap_or(Path::new(""));
    match serde_json::from_str::<TsConfig>(&strip_jsonc(&raw)) {
        Ok(config) => aliases_from(&config.compiler_options, dir),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Ignoring unparseable tsconfig");
            Vec::new()
        }
    }
}

/// `alias/*` → `target/*` becomes `alias` → `target`; exact keys map to
/// their first target. Patterns with a `*` elsewhere are not expressible as
/// prefix aliases and are skipped.
fn aliases_from(options: &CompilerOptions, dir: &Path) -> Vec<PathAlias> {
    let base = dir.join(options.base_url.as_deref().unwrap_or("."));
    options
        .paths
        .iter()
        .filter_map(|(key, targets)| {
            let target = targets.first()?;
            let (key, target) = match (key.strip_suffix("/*"), target.strip_suffix("/*")) {
                (Some(key), Some(target)) => (key, target),
                _ if !key.contains('*') && !target.contains('*') => (key.as_str(), target.as_str()),
                _ => return None,
            };
            Some(PathAlias {
                key: key.to_string(),
                target: base.join(target).clean(),
            })
        })
        .collect()
}

/// Drop comments and trailing commas so tsconfig parses as JSON.
fn strip_jsonc(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            (',', _) => {
                let next = chars.clone().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}
