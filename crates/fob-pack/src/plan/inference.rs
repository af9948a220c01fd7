//! Source path inference from declared output paths.
//!
//! `./dist/utils/index.mjs` with source root `src` maps to
//! `src/utils/index.js` when that file exists and `src/utils/index.ts`
//! otherwise. The second path segment is always the one swapped for the
//! source root, however deeply the output is nested.

use std::path::{Path, PathBuf};

use path_clean::PathClean;

use super::target::split_extension;

/// Infer the source entry for `output`, relative to `root`.
///
/// With a `matcher`, the output's file name is replaced by it verbatim and no
/// probing happens. Otherwise a `.js` sibling wins over the `.ts` default.
/// Never fails: a miss surfaces later when the engine reads the file.
pub async fn infer_input_path(
    root: &Path,
    source_root: &str,
    output: &str,
    matcher: Option<&str>,
) -> PathBuf {
    let (dir, file_name) = substitute_source_root(source_root, output);
    let base = root.join(dir);

    if let Some(matcher) = matcher {
        return base.join(matcher).clean();
    }

    let (stem, _) = split_extension(&file_name);
    let js = base.join(format!("{stem}.js")).clean();
    match tokio::fs::try_exists(&js).await {
        Ok(true) => js,
        _ => base.join(format!("{stem}.ts")).clean(),
    }
}

/// Replace the distribution segment with `source_root` and split off the
/// file name.
fn substitute_source_root(source_root: &str, output: &str) -> (PathBuf, String) {
    let mut segments: Vec<&str> = output.split('/').collect();
    let file_name = segments.pop().unwrap_or_default().to_string();

    if segments.len() >= 2 {
        segments[1] = source_root;
    }

    let dir = segments
        .iter()
        .filter(|s| !s.is_empty())
        .fold(PathBuf::new(), |acc, s| acc.join(s));
    (dir, file_name)
}
