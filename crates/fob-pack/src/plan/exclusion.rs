//! Exclusion rules that strip declared targets from the plan.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::target::{BinTargets, OutputTarget, TargetField};

/// One `exclude` entry of the `exports` scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExclusionRule {
    /// Remove the whole export target.
    Key(String),
    /// Remove only the flagged sub-fields of one target.
    Fields {
        path: String,
        #[serde(default)]
        types: bool,
        #[serde(default)]
        import: bool,
        #[serde(default)]
        require: bool,
    },
}

impl ExclusionRule {
    fn fields(&self) -> Vec<TargetField> {
        match self {
            ExclusionRule::Key(_) => Vec::new(),
            ExclusionRule::Fields {
                types,
                import,
                require,
                ..
            } => [
                (TargetField::Types, *types),
                (TargetField::Import, *import),
                (TargetField::Require, *require),
            ]
            .into_iter()
            .filter_map(|(field, on)| on.then_some(field))
            .collect(),
        }
    }
}

/// Apply `rules` to `targets` in rule order.
///
/// Rules naming unknown keys, or fields already removed, are no-ops, so
/// applying the same rules twice yields the same map.
pub fn apply_exclusions(
    mut targets: IndexMap<String, OutputTarget>,
    rules: &[ExclusionRule],
) -> IndexMap<String, OutputTarget> {
    for rule in rules {
        match rule {
            ExclusionRule::Key(key) => {
                if targets.shift_remove(key).is_some() {
                    tracing::debug!(key = %key, "Excluded export target");
                }
            }
            ExclusionRule::Fields { path, .. } => {
                if let Some(target) = targets.get_mut(path) {
                    for field in rule.fields() {
                        target.clear(field);
                        tracing::debug!(
                            key = %path,
                            field = field.as_str(),
                            "Excluded export field"
                        );
                    }
                }
            }
        }
    }
    targets
}

/// Remove binaries by name. Binaries have no sub-fields to exclude.
pub fn apply_bin_exclusions(bin: BinTargets, names: &[String]) -> BinTargets {
    if names.is_empty() {
        return bin;
    }
    match bin {
        BinTargets::Single { name, path } => {
            if names.contains(&name) {
                tracing::debug!(name = %name, "Excluded binary");
                BinTargets::Named(IndexMap::new())
            } else {
                BinTargets::Single { name, path }
            }
        }
        BinTargets::Named(mut map) => {
            for name in names {
                if map.shift_remove(name).is_some() {
                    tracing::debug!(name = %name, "Excluded binary");
                }
            }
            BinTargets::Named(map)
        }
    }
}
