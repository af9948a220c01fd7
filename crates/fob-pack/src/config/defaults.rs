use super::ExternalPattern;
use crate::manifest::Manifest;

/// Source root used when none is configured.
pub const DEFAULT_SOURCE_ROOT: &str = "src";

/// Conventional config file names, in probe order.
pub const CONFIG_FILES: [&str; 3] = ["fob-pack.toml", "fob-pack.json", "fob-pack.yaml"];

/// Prefix of environment overrides (`FOB_PACK_MINIFY`, `FOB_PACK_TSCONFIG`).
pub const ENV_PREFIX: &str = "FOB_PACK_";

/// Externals every build starts from: runtime builtins, the bundler itself,
/// and every declared dependency.
pub fn default_externals(manifest: &Manifest) -> Vec<ExternalPattern> {
    let mut externals = Vec::with_capacity(manifest.dependencies.len() + 2);
    externals.extend(builtin_pattern(r"^node:"));
    externals.extend(builtin_pattern(r"^rolldown"));
    externals.extend(
        manifest
            .dependency_names()
            .map(|name| ExternalPattern::Package(name.to_string())),
    );
    externals
}

fn builtin_pattern(pattern: &str) -> Option<ExternalPattern> {
    ExternalPattern::regex(pattern).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_externals() {
        let manifest =
            Manifest::parse(r#"{ "dependencies": { "zod": "^3" } }"#, "package.json").unwrap();
        let externals = default_externals(&manifest);
        assert_eq!(externals.len(), 3);
        assert!(externals.iter().any(|e| e.matches("node:path")));
        assert!(externals.iter().any(|e| e.matches("rolldown/plugins")));
        assert!(externals.iter().any(|e| e.matches("zod")));
        assert!(!externals.iter().any(|e| e.matches("lodash")));
    }
}
