use std::path::PathBuf;

use thiserror::Error;

/// Errors the asset server can hit while starting or serving.
/// All variants carry a human-readable message for display/logging.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Assets ───────────────────────────────────────────────────────────────
    #[error("Asset directory '{}' does not exist", .path.display())]
    AssetsDirMissing { path: PathBuf },

    #[error("Index page not found at '{}'", .path.display())]
    IndexNotFound { path: PathBuf },

    #[error("Failed to read '{}': {source}", .path.display())]
    AssetRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Network ──────────────────────────────────────────────────────────────
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

impl AppError {
    pub fn asset_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            AppError::IndexNotFound { path }
        } else {
            AppError::AssetRead { path, source }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::IndexNotFound { .. } | AppError::AssetsDirMissing { .. })
    }
}
