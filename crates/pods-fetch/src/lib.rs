//! Downloading pods into a shared, version-gated disk cache.
//!
//! ```rust,no_run
//! use pods_fetch::{Config, DownloadContext, Downloader, Request, Specification};
//! use pods_downloader::{options_from, Scalar};
//! use std::path::Path;
//!
//! # async fn run() -> pods_fetch::Result<()> {
//! let spec = Specification::new("Alamofire")
//!     .with_version("5.9.1")
//!     .with_source(options_from([
//!         ("git", Scalar::from("https://github.com/Alamofire/Alamofire.git")),
//!         ("tag", Scalar::from("5.9.1")),
//!     ]));
//!
//! let downloader = Downloader::new(Config::build(true)?, DownloadContext::default())?;
//! let response = downloader
//!     .download(&Request::released(spec)?, Some(Path::new("Pods/Alamofire")), true)
//!     .await?;
//! println!("{:?}", response.checkout_options);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod downloader;
pub mod error;
pub mod lock;
pub mod mirror;
pub mod request;
pub mod response;
pub mod spec;

pub use cache::{group_subspecs_by_platform, Cache, CacheDescriptor};
pub use config::{Config, ConfigLoader};
pub use context::{
    DirCleaner, DownloadContext, ManifestFinder, NoopCleaner, NoopPreparer, PodspecFinder,
    SourcePreparer, SpecsByPlatform,
};
pub use downloader::{download_request, download_source, DownloadJob, Downloader};
pub use error::{FetchError, Result};
pub use lock::{with_lock, FileLock, LockMode};
pub use mirror::{copy_dir, mirror_dir};
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use spec::{Specification, Version};
