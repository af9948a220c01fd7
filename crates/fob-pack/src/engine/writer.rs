//! Output file writing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use path_clean::PathClean;

/// Write `content` to `file`, creating parent directories.
pub(crate) async fn write_output(file: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = file.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory '{}'", parent.display()))?;
    }
    tokio::fs::write(file, content)
        .await
        .with_context(|| format!("Failed to write '{}'", file.display()))
}

/// Resolve a secondary chunk file name against the primary output's
/// directory, refusing names that escape it.
pub(crate) fn chunk_path(base_dir: &Path, filename: &str) -> Result<PathBuf> {
    if filename.contains('\0') {
        anyhow::bail!("Chunk file name contains a null byte");
    }

    let base_dir = base_dir.clean();
    let full_path = base_dir.join(Path::new(filename).clean()).clean();
    if !full_path.starts_with(&base_dir) {
        anyhow::bail!(
            "Chunk '{}' escapes output directory '{}' (resolved to '{}')",
            filename,
            base_dir.display(),
            full_path.display()
        );
    }
    Ok(full_path)
}
