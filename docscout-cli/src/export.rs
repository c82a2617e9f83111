use anyhow::{Context, Result};
use docscout::MatchResult;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Picks a destination for `name` inside `dir` that does not exist yet,
/// appending ` (1)`, ` (2)`, ... before the extension on collisions
pub fn unique_destination(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let original = Path::new(name);
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let extension = original.extension().map(|e| e.to_string_lossy().into_owned());

    (1..)
        .map(|n| {
            let file_name = match &extension {
                Some(ext) => format!("{} ({}).{}", stem, n, ext),
                None => format!("{} ({})", stem, n),
            };
            dir.join(file_name)
        })
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Copies every matched document into `dir`, returning the written paths
pub async fn export_matches(results: &[&MatchResult], dir: &Path) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Cannot create export directory {}", dir.display()))?;

    let mut written = Vec::with_capacity(results.len());
    for result in results {
        let bytes = result
            .document
            .read_bytes()
            .await
            .with_context(|| format!("Cannot read {}", result.document_name()))?;
        let destination = unique_destination(dir, result.document_name());
        tokio::fs::write(&destination, bytes)
            .await
            .with_context(|| format!("Cannot write {}", destination.display()))?;
        debug!("Exported {} to {}", result.document_name(), destination.display());
        written.push(destination);
    }
    Ok(written)
}
