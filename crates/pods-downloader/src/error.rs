use thiserror::Error;

/// Broad classification of downloader failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad options or strategy selection, raised before any I/O
    Configuration,
    /// A subprocess failed or could not be started
    Transfer,
    /// The fetched artifact is not what was asked for
    Integrity,
    /// Local filesystem failure
    Io,
}

#[derive(Error, Debug)]
pub enum DownloaderError {
    // Configuration errors
    #[error("No source URL provided.")]
    NoSource,

    #[error("Unsupported download strategy `{0}`")]
    UnsupportedStrategy(String),

    #[error("Unrecognized options `{}` for the `{strategy}` downloader", .options.join(", "))]
    UnrecognizedOptions {
        strategy: &'static str,
        options: Vec<String>,
    },

    #[error("Provided unsafe input for git {0}")]
    UnsafeInput(String),

    #[error("The `{0}` downloader does not support the HEAD option.")]
    HeadUnsupported(&'static str),

    #[error("Invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    // Transfer errors
    #[error("Failed to execute `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command `{command}` failed ({status})\n{output}")]
    CommandFailed {
        command: String,
        status: String,
        output: String,
    },

    // Integrity errors
    #[error("Verification checksum was incorrect, expected {expected}, got {actual}")]
    ChecksumMismatch {
        algorithm: &'static str,
        expected: String,
        actual: String,
    },

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Invalid DMG: Missing mount point")]
    MissingMountPoint,

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloaderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DownloaderError::NoSource
            | DownloaderError::UnsupportedStrategy(_)
            | DownloaderError::UnrecognizedOptions { .. }
            | DownloaderError::UnsafeInput(_)
            | DownloaderError::HeadUnsupported(_)
            | DownloaderError::InvalidUrl { .. } => ErrorKind::Configuration,
            DownloaderError::Spawn { .. } | DownloaderError::CommandFailed { .. } => {
                ErrorKind::Transfer
            }
            DownloaderError::ChecksumMismatch { .. }
            | DownloaderError::UnsupportedFileType(_)
            | DownloaderError::MissingMountPoint => ErrorKind::Integrity,
            DownloaderError::Io(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, DownloaderError>;
