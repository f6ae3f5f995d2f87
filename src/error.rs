use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading scripts from disk.
///
/// Queries never fail; they answer with `None` or an empty result instead.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("workspace root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {}: {source}", .root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl WorkspaceError {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WorkspaceError::Read {
            path: path.into(),
            source,
        }
    }
}
