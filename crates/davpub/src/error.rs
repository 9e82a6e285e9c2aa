use std::path::PathBuf;

use thiserror::Error;

/// Failures that end a publish run.
///
/// They travel inside `anyhow::Error` and can be recovered with
/// `err.downcast_ref::<PublishError>()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// A published artifact could not be fetched back with a `200`.
    #[error("verification failed for {artifact} - {status} : {message}")]
    Verification {
        artifact: String,
        status: String,
        message: String,
    },

    /// Tracked files that must exist locally before anything is uploaded.
    #[error("tracked artifacts missing locally: {}", join_paths(.paths))]
    MissingArtifacts { paths: Vec<PathBuf> },

    #[error("documentation tree not found: {}", .path.display())]
    MissingDocs { path: PathBuf },
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
