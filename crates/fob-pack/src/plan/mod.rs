//! Build plan primitives: declared targets, exclusions and source inference.

pub mod exclusion;
pub mod inference;
pub mod target;

pub use exclusion::{ExclusionRule, apply_bin_exclusions, apply_exclusions};
pub use inference::infer_input_path;
pub use target::{
    BinTargets, DECLARATION_SUFFIXES, OutputTarget, TargetField, is_declaration_path,
    is_path_allowed,
};
