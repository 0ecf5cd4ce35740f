//! Download strategies for fetching pod sources.
//!
//! A flat option bag selects one strategy by its trigger key (`git`, `http`
//! or `scp`); the strategy validates the remaining options, fetches into a
//! target directory and reports what it fetched.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pods_downloader::{for_target, options_from, LogNarrator, Scalar, SystemCommandRunner};
//!
//! # async fn run() -> pods_downloader::Result<()> {
//! let options = options_from([
//!     ("git", Scalar::from("https://github.com/Alamofire/Alamofire.git")),
//!     ("tag", Scalar::from("5.9.1")),
//! ]);
//! let strategy = for_target(
//!     "/tmp/Alamofire",
//!     &options,
//!     Arc::new(SystemCommandRunner::new()),
//!     Arc::new(LogNarrator),
//! )?;
//! strategy.download().await?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod checksum;
pub mod command;
pub mod dispatch;
pub mod error;
pub mod git;
pub mod http;
pub mod narrator;
pub mod options;
pub mod progress;
pub mod remote_file;
pub mod scp;
pub mod strategy;

pub use archive::{ArchiveExtractor, ArchiveType};
pub use checksum::{compute_checksum, verify_checksum, ChecksumType};
pub use command::{CommandRunner, Invocation, SystemCommandRunner};
pub use dispatch::{for_target, preprocess_options, strategy_from_options};
pub use error::{DownloaderError, ErrorKind, Result};
pub use git::Git;
pub use narrator::{narrate, ActionLevel, LogNarrator, Narrator, SilentNarrator};
pub use options::{options_from, Options, Scalar};
pub use progress::ProgressNarrator;
pub use remote_file::RemoteFile;
pub use strategy::{user_agent_string, Strategy, StrategyKind};
