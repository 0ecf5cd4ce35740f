//! Shared strategy lifecycle: option validation, target preparation,
//! narration and the capability interface every strategy exposes.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::command::CommandRunner;
use crate::git::Git;
use crate::narrator::{narrate, ActionLevel, Narrator};
use crate::options::Options;
use crate::remote_file::RemoteFile;
use crate::{DownloaderError, Result};

/// The known strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Git,
    Http,
    Scp,
}

struct StrategyDescriptor {
    kind: StrategyKind,
    /// Option key that selects the strategy; its value is the URL
    trigger: &'static str,
    name: &'static str,
    /// Keys accepted next to the trigger
    options: &'static [&'static str],
    head: bool,
}

const ARCHIVE_OPTIONS: &[&str] = &["type", "flatten", "sha1", "sha256", "headers"];

const STRATEGIES: &[StrategyDescriptor] = &[
    StrategyDescriptor {
        kind: StrategyKind::Git,
        trigger: "git",
        name: "Git",
        options: &["commit", "tag", "branch", "submodules"],
        head: true,
    },
    StrategyDescriptor {
        kind: StrategyKind::Http,
        trigger: "http",
        name: "Http",
        options: ARCHIVE_OPTIONS,
        head: false,
    },
    StrategyDescriptor {
        kind: StrategyKind::Scp,
        trigger: "scp",
        name: "Scp",
        options: ARCHIVE_OPTIONS,
        head: false,
    },
];

impl StrategyKind {
    pub fn all() -> [StrategyKind; 3] {
        [StrategyKind::Git, StrategyKind::Http, StrategyKind::Scp]
    }

    fn descriptor(self) -> &'static StrategyDescriptor {
        STRATEGIES
            .iter()
            .find(|d| d.kind == self)
            .unwrap_or(&STRATEGIES[0])
    }

    /// Strategy for a trigger key such as `git`
    pub fn from_trigger(key: &str) -> Option<Self> {
        STRATEGIES.iter().find(|d| d.trigger == key).map(|d| d.kind)
    }

    pub fn trigger(self) -> &'static str {
        self.descriptor().trigger
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn recognized_options(self) -> &'static [&'static str] {
        self.descriptor().options
    }

    pub fn head_supported(self) -> bool {
        self.descriptor().head
    }

    /// Keys of `options` this strategy does not know, in input order
    pub fn unrecognized_options(self, options: &Options) -> Vec<String> {
        let recognized = self.recognized_options();
        options
            .keys()
            .filter(|key| key.as_str() != self.trigger() && !recognized.contains(&key.as_str()))
            .cloned()
            .collect()
    }
}

/// User agent sent with HTTP downloads
pub fn user_agent_string() -> String {
    format!("pods-downloader/{}", env!("CARGO_PKG_VERSION"))
}

/// State shared by every strategy
pub struct Base {
    kind: StrategyKind,
    target_path: PathBuf,
    url: String,
    options: Options,
    runner: Arc<dyn CommandRunner>,
    narrator: Arc<dyn Narrator>,
}

impl Base {
    /// Validate `options` against the strategy's recognized keys
    pub fn new(
        kind: StrategyKind,
        target_path: impl Into<PathBuf>,
        url: impl Into<String>,
        options: Options,
        runner: Arc<dyn CommandRunner>,
        narrator: Arc<dyn Narrator>,
    ) -> Result<Self> {
        let unrecognized = kind.unrecognized_options(&options);
        if !unrecognized.is_empty() {
            return Err(DownloaderError::UnrecognizedOptions {
                strategy: kind.name(),
                options: unrecognized,
            });
        }

        Ok(Self {
            kind,
            target_path: target_path.into(),
            url: url.into(),
            options,
            runner,
            narrator,
        })
    }

    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub(crate) fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub(crate) fn narrator(&self) -> &dyn Narrator {
        self.narrator.as_ref()
    }

    /// Run a narrated minor step
    pub(crate) async fn sub_action<F, T>(&self, message: &str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        narrate(self.narrator(), ActionLevel::SubAction, message, future).await
    }

    /// Start every download from an empty target directory
    async fn prepare_target(&self) -> Result<()> {
        if tokio::fs::try_exists(&self.target_path).await? {
            tokio::fs::remove_dir_all(&self.target_path).await?;
        }
        tokio::fs::create_dir_all(&self.target_path).await?;
        Ok(())
    }
}

/// A configured download strategy
pub enum Strategy {
    Git(Git),
    RemoteFile(RemoteFile),
}

impl Strategy {
    /// Build the strategy for `kind`, rejecting unknown options
    pub fn new(
        kind: StrategyKind,
        target_path: impl Into<PathBuf>,
        url: impl Into<String>,
        options: Options,
        runner: Arc<dyn CommandRunner>,
        narrator: Arc<dyn Narrator>,
    ) -> Result<Self> {
        let base = Base::new(kind, target_path, url, options, runner, narrator)?;
        Ok(match kind {
            StrategyKind::Git => Strategy::Git(Git::new(base)),
            StrategyKind::Http | StrategyKind::Scp => Strategy::RemoteFile(RemoteFile::new(base)),
        })
    }

    fn base(&self) -> &Base {
        match self {
            Strategy::Git(git) => git.base(),
            Strategy::RemoteFile(remote) => remote.base(),
        }
    }

    pub fn kind(&self) -> StrategyKind {
        self.base().kind()
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn url(&self) -> &str {
        self.base().url()
    }

    pub fn target_path(&self) -> &Path {
        self.base().target_path()
    }

    pub fn options(&self) -> &Options {
        self.base().options()
    }

    pub fn head_supported(&self) -> bool {
        self.kind().head_supported()
    }

    /// Fetch the source into an emptied target directory
    pub async fn download(&self) -> Result<()> {
        let message = format!("{} download", self.name());
        let base = self.base();
        narrate(base.narrator(), ActionLevel::Action, &message, async {
            base.prepare_target().await?;
            match self {
                Strategy::Git(git) => git.perform_download().await,
                Strategy::RemoteFile(remote) => remote.perform_download().await,
            }
        })
        .await
    }

    /// Fetch the newest revision, ignoring any pinned ref
    pub async fn download_head(&self) -> Result<()> {
        let message = format!("{} HEAD download", self.name());
        let base = self.base();
        narrate(base.narrator(), ActionLevel::Action, &message, async {
            match self {
                Strategy::Git(git) => {
                    base.prepare_target().await?;
                    git.perform_download_head().await
                }
                Strategy::RemoteFile(_) => Err(DownloaderError::HeadUnsupported(self.name())),
            }
        })
        .await
    }

    /// Options that pin exactly what was downloaded
    pub async fn checkout_options(&self) -> Result<Options> {
        match self {
            Strategy::Git(git) => git.checkout_options().await,
            Strategy::RemoteFile(remote) => Ok(remote.checkout_options()),
        }
    }

    /// Whether the request options alone reproduce this exact download.
    ///
    /// When false, callers should persist [`Strategy::checkout_options`]
    /// instead of the options they passed in.
    pub fn options_specific(&self) -> bool {
        match self {
            Strategy::Git(git) => git.options_specific(),
            Strategy::RemoteFile(_) => true,
        }
    }
}
