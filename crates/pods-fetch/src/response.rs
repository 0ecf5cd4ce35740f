use std::path::PathBuf;

use pods_downloader::Options;

use crate::spec::Specification;

/// Result of a download request
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Where the source tree now lives; `None` only while a cache entry is
    /// being populated
    pub location: Option<PathBuf>,

    /// Manifest for the requested pod, when one is known
    pub spec: Option<Specification>,

    /// Options that reproduce exactly this download
    pub checkout_options: Options,
}

impl Response {
    pub fn new(location: impl Into<PathBuf>, spec: Option<Specification>, checkout_options: Options) -> Self {
        Self {
            location: Some(location.into()),
            spec,
            checkout_options,
        }
    }
}
