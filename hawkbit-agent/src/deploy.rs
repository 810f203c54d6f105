use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::ddi::{self, Artifact, DdiClient, Deployment, Download, UpdateResult};
use crate::util::crypto::Sha256Hasher;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Ddi(#[from] ddi::Error),

    #[error("failed to write {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("refusing to write artifact with name '{0}'")]
    Filename(String),

    #[error("sha256 mismatch for {filename}: expected {expected}, got {actual}")]
    HashMismatch {
        filename: String,
        expected: String,
        actual: String,
    },
}

/// Log feedback calls the server did not accept
pub fn check_result(action: &str, result: UpdateResult) {
    if !result.is_success() {
        warn!("server rejected {action}: {}", result.status());
    }
}

/// Download every artifact of the deployment into `dir`, reporting
/// progress to the server as it goes.
///
/// Download failures end up in the final feedback, only failures to report
/// are returned to the caller.
#[instrument(skip_all, fields(id = deployment.id()), err(level = "warn"))]
pub async fn deploy(
    client: &DdiClient,
    deployment: &Deployment,
    dir: &Path,
) -> Result<bool, ddi::Error> {
    let artifacts: Vec<&Artifact> = deployment.artifacts().collect();
    let total = artifacts.len() as u32;

    let result = client.report_progress(deployment, 0, total, &[]).await?;
    check_result("progress", result);

    let mut details = Vec::new();
    let mut success = true;
    for (done, artifact) in (1..).zip(artifacts) {
        match download_artifact(client, artifact, dir).await {
            Ok(path) => {
                info!("downloaded {}", path.display());
                let detail = format!("downloaded {}", artifact.filename());
                let result = client
                    .report_progress(deployment, done, total, std::slice::from_ref(&detail))
                    .await?;
                check_result("progress", result);
                details.push(detail);
            }
            Err(e) => {
                warn!("download of {} failed: {e}", artifact.filename());
                details.push(e.to_string());
                success = false;
                break;
            }
        }
    }

    let result = client.report_complete(deployment, success, &details).await?;
    check_result("completion", result);

    Ok(success)
}

fn target_path(dir: &Path, filename: &str) -> Result<PathBuf, DeployError> {
    if filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\'])
    {
        return Err(DeployError::Filename(filename.to_owned()));
    }
    Ok(dir.join(filename))
}

async fn download_artifact(
    client: &DdiClient,
    artifact: &Artifact,
    dir: &Path,
) -> Result<PathBuf, DeployError> {
    let path = target_path(dir, artifact.filename())?;

    let res = fetch_verified(client, artifact, &path).await;
    if res.is_err() {
        // leave nothing behind that could be mistaken for the artifact
        discard(&path).await;
    }

    res.map(|_| path)
}

async fn fetch_verified(
    client: &DdiClient,
    artifact: &Artifact,
    path: &Path,
) -> Result<(), DeployError> {
    let digest = client
        .download(artifact, async |download: &mut Download| {
            write_to(download, path).await
        })
        .await??;

    if let Some(expected) = artifact.hashes().get("sha256")
        && !expected.eq_ignore_ascii_case(&digest)
    {
        return Err(DeployError::HashMismatch {
            filename: artifact.filename().to_owned(),
            expected: expected.clone(),
            actual: digest,
        });
    }

    Ok(())
}

async fn discard(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!("removed {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("failed to remove {}: {e}", path.display()),
    }
}

async fn write_to(download: &mut Download, path: &Path) -> Result<String, DeployError> {
    let io_err = |e| DeployError::Io(path.to_path_buf(), e);

    let mut file = File::create(path).await.map_err(io_err)?;
    let mut hasher = Sha256Hasher::default();
    while let Some(chunk) = download.chunk().await? {
        hasher.update(&chunk);
        file.write_all(&chunk).await.map_err(io_err)?;
    }
    file.flush().await.map_err(io_err)?;

    Ok(hasher.finish())
}
