use std::path::PathBuf;
use thiserror::Error;

use pods_downloader::DownloaderError;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Downloader(#[from] DownloaderError),

    #[error("Invalid download request: {0}")]
    InvalidRequest(String),

    #[error("Unable to parse manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unable to lock {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Error installing {name}: {source}")]
    Pod {
        name: String,
        #[source]
        source: Box<FetchError>,
    },
}

impl FetchError {
    /// Attach the pod name, once
    pub fn for_pod(self, name: &str) -> Self {
        match self {
            FetchError::Pod { .. } => self,
            other => FetchError::Pod {
                name: name.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The strategy error underneath any pod annotation
    pub fn downloader_error(&self) -> Option<&DownloaderError> {
        match self {
            FetchError::Downloader(e) => Some(e),
            FetchError::Pod { source, .. } => source.downloader_error(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_pod_wraps_once() {
        let err = FetchError::InvalidRequest("Requires a name".to_string())
            .for_pod("Alamofire")
            .for_pod("Other");

        assert_eq!(
            err.to_string(),
            "Error installing Alamofire: Invalid download request: Requires a name"
        );
    }

    #[test]
    fn test_downloader_error_is_reachable_through_annotation() {
        let err = FetchError::from(DownloaderError::NoSource).for_pod("Foo");
        assert!(matches!(err.downloader_error(), Some(DownloaderError::NoSource)));
        assert!(FetchError::Config("x".into()).downloader_error().is_none());
    }
}
