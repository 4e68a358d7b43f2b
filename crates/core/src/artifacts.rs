use std::path::{Path, PathBuf};

use pkup_developer_platforms::RemoteClient;
use tracing::{debug, instrument};

use crate::errors::PkupError;

#[cfg(test)]
#[path = "artifacts_tests.rs"]
mod tests;

const SHORT_SHA_LEN: usize = 8;

/// File name of the diff saved for a commit: `{org}_{repo}_{sha8}.diff`.
///
/// SHAs shorter than eight characters are used whole.
pub fn build_diff_filename(sha: &str, org: &str, repo: &str) -> String {
    let short = sha.get(..SHORT_SHA_LEN).unwrap_or(sha);
    format!("{}_{}_{}.diff", org, repo, short)
}

/// Makes `dir` absolute and creates it, parents included.
pub fn sanitize_output_dir(dir: &str) -> Result<PathBuf, PkupError> {
    let artifact_error = |path: &Path, e: std::io::Error| PkupError::Artifact {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let path = Path::new(if dir.is_empty() { "." } else { dir });
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| artifact_error(path, e))?
            .join(path)
    };

    std::fs::create_dir_all(&absolute).map_err(|e| artifact_error(absolute.as_path(), e))?;
    Ok(absolute)
}

/// Writes `content` to `dir/filename`, replacing an existing file.
pub async fn write_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf, PkupError> {
    let path = dir.join(filename);
    tokio::fs::write(&path, content)
        .await
        .map_err(|e| PkupError::Artifact {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    Ok(path)
}

/// Downloads the diff of every SHA and writes the non-empty ones to `dir`.
///
/// Stops at the first failure. Files written before it stay on disk.
#[instrument(skip(client, shas, dir), fields(count = shas.len()))]
pub async fn save_diffs(
    client: &dyn RemoteClient,
    org: &str,
    repo: &str,
    shas: &[String],
    dir: &Path,
) -> Result<(), PkupError> {
    for sha in shas {
        let diff = client
            .get_diff(org, repo, sha)
            .await
            .map_err(|e| PkupError::Artifact {
                path: build_diff_filename(sha, org, repo),
                message: e.to_string(),
            })?;

        if diff.is_empty() {
            debug!(sha = sha.as_str(), "Skipping empty diff");
            continue;
        }

        write_file(dir, &build_diff_filename(sha, org, repo), &diff).await?;
    }

    Ok(())
}
