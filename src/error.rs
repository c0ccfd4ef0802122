use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for dataclean operations.
#[derive(Debug, Error)]
pub enum DatacleanError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Dataset root {path} does not exist or is not a directory")]
    RootNotFound { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to rename {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to append to failure log {path}: {source}")]
    FailureLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed while traversing {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to write manifest {path}: {source}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    ReportJson(#[from] serde_json::Error),

    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

impl DatacleanError {
    /// The underlying I/O error, if this error wraps one.
    pub fn io_source(&self) -> Option<&io::Error> {
        match self {
            DatacleanError::Io(source)
            | DatacleanError::ReadDir { source, .. }
            | DatacleanError::Rename { source, .. }
            | DatacleanError::FailureLog { source, .. }
            | DatacleanError::ManifestWrite { source, .. } => Some(source),
            DatacleanError::Walk { source, .. } => source.io_error(),
            _ => None,
        }
    }

    /// True when the failure was a permission error from the filesystem.
    pub fn is_permission_denied(&self) -> bool {
        self.io_source()
            .is_some_and(|source| source.kind() == io::ErrorKind::PermissionDenied)
    }
}

/// Why an image failed the integrity check.
#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("cannot identify image {path}: {source}")]
    Header {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("cannot open image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt image data in {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_is_detected_through_wrappers() {
        let err = DatacleanError::Rename {
            from: PathBuf::from("a.jpg"),
            to: PathBuf::from("b.jpg"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert!(err.is_permission_denied());

        let err = DatacleanError::Io(io::Error::from(io::ErrorKind::NotFound));
        assert!(!err.is_permission_denied());

        let err = DatacleanError::InvalidOption("x".to_string());
        assert!(err.io_source().is_none());
    }
}
