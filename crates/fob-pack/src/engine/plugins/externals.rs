use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use rolldown_common::ResolvedExternal;
use rolldown_plugin::{
    HookResolveIdArgs, HookResolveIdOutput, HookResolveIdReturn, HookUsage, Plugin, PluginContext,
};

use crate::config::ExternalPattern;
use crate::engine::{EngineLog, LogCallback};

/// Marks configured externals, and bare specifiers when no resolve stage is
/// present, as external.
pub(crate) struct ExternalsPlugin {
    patterns: Vec<ExternalPattern>,
    /// Leave unmatched bare specifiers external with an `UNRESOLVED_IMPORT`
    /// log.
    bare_external: bool,
    /// Path alias keys that look bare but resolve locally.
    alias_keys: Vec<String>,
    on_log: LogCallback,
}

impl ExternalsPlugin {
    pub(crate) fn new(patterns: Vec<ExternalPattern>, on_log: LogCallback) -> Self {
        Self {
            patterns,
            bare_external: false,
            alias_keys: Vec::new(),
            on_log,
        }
    }

    pub(crate) fn with_bare_external(mut self, alias_keys: Vec<String>) -> Self {
        self.bare_external = true;
        self.alias_keys = alias_keys;
        self
    }

    fn is_aliased(&self, specifier: &str) -> bool {
        self.alias_keys.iter().any(|key| {
            specifier
                .strip_prefix(key.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }
}

impl fmt::Debug for ExternalsPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalsPlugin")
            .field("patterns", &self.patterns)
            .field("bare_external", &self.bare_external)
            .field("alias_keys", &self.alias_keys)
            .finish_non_exhaustive()
    }
}

/// A specifier that names a package rather than a file.
pub(crate) fn is_bare_specifier(specifier: &str) -> bool {
    !(specifier.is_empty()
        || specifier.starts_with('.')
        || specifier.starts_with('/')
        || specifier.starts_with('\0')
        || specifier.starts_with('#')
        || Path::new(specifier).is_absolute())
}

fn external(specifier: &str) -> HookResolveIdReturn {
    Ok(Some(HookResolveIdOutput {
        id: specifier.into(),
        external: Some(ResolvedExternal::Bool(true)),
        ..Default::default()
    }))
}

impl Plugin for ExternalsPlugin {
    fn name(&self) -> Cow<'static, str> {
        "fob-pack:externals".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let specifier = args.specifier.to_string();
        let importer = args.importer.map(str::to_string);

        let decision = match importer {
            // Entries are never external.
            None => Decision::Defer,
            Some(_) if self.patterns.iter().any(|p| p.matches(&specifier)) => {
                Decision::External
            }
            Some(importer)
                if self.bare_external
                    && is_bare_specifier(&specifier)
                    && !self.is_aliased(&specifier) =>
            {
                (self.on_log)(
                    EngineLog::warn(
                        "UNRESOLVED_IMPORT",
                        format!(
                            "\"{specifier}\" is imported by \"{importer}\", but could not be resolved, treating it as an external dependency"
                        ),
                    )
                    .with_plugin(self.name())
                    .with_id(importer),
                );
                Decision::External
            }
            Some(_) => Decision::Defer,
        };

        async move {
            match decision {
                Decision::External => external(&specifier),
                Decision::Defer => Ok(None),
            }
        }
    }
}

enum Decision {
    External,
    Defer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_specifiers() {
        assert!(is_bare_specifier("react"));
        assert!(is_bare_specifier("@scope/pkg/sub"));
        assert!(is_bare_specifier("node:fs"));
        assert!(!is_bare_specifier("./local"));
        assert!(!is_bare_specifier("../up"));
        assert!(!is_bare_specifier("/abs/path.js"));
        assert!(!is_bare_specifier("#internal"));
        assert!(!is_bare_specifier("\0virtual"));
    }

    #[test]
    fn test_alias_keys_are_exempt() {
        let plugin = ExternalsPlugin::new(Vec::new(), std::sync::Arc::new(|_| {}))
            .with_bare_external(vec!["@".into(), "config".into()]);
        assert!(plugin.is_aliased("@/utils"));
        assert!(plugin.is_aliased("config"));
        assert!(!plugin.is_aliased("@scope/pkg"));
        assert!(!plugin.is_aliased("configstore"));
    }
}
