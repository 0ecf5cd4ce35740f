//! Collaborators the download pipeline calls out to.

use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;

use pods_downloader::{CommandRunner, Narrator, SilentNarrator, SystemCommandRunner};

use crate::error::{FetchError, Result};
use crate::spec::Specification;

/// Subspecs of a pod grouped by the platforms they support
pub type SpecsByPlatform = IndexMap<String, Vec<Specification>>;

/// Finds the manifests shipped inside a downloaded source tree
pub trait ManifestFinder: Send + Sync {
    fn podspecs(&self, root: &Path) -> Result<IndexMap<String, Specification>>;
}

/// Runs a pod's preparation step on a freshly downloaded tree
pub trait SourcePreparer: Send + Sync {
    fn prepare(&self, _spec: Option<&Specification>, _root: &Path) -> Result<()> {
        Ok(())
    }
}

/// Removes files a pod does not need on any of its platforms
pub trait DirCleaner: Send + Sync {
    fn clean(&self, _root: &Path, _specs_by_platform: &SpecsByPlatform) -> Result<()> {
        Ok(())
    }
}

/// Loads `*.podspec.json` files at the top of the tree
#[derive(Debug, Default, Clone, Copy)]
pub struct PodspecFinder;

impl ManifestFinder for PodspecFinder {
    fn podspecs(&self, root: &Path) -> Result<IndexMap<String, Specification>> {
        let pattern = Path::new(&glob::Pattern::escape(&root.to_string_lossy()))
            .join("*.podspec.json")
            .to_string_lossy()
            .to_string();

        let mut podspecs = IndexMap::new();
        let mut paths: Vec<_> = glob::glob(&pattern)
            .map_err(|e| FetchError::Config(format!("Invalid manifest pattern {}: {}", pattern, e)))?
            .filter_map(|entry| entry.ok())
            .collect();
        paths.sort();

        for path in paths {
            let spec = Specification::from_file(&path)?;
            log::debug!("Found manifest {} in {}", spec.name, path.display());
            podspecs.insert(spec.name.clone(), spec);
        }

        Ok(podspecs)
    }
}

/// Preparer that leaves the tree untouched
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPreparer;

impl SourcePreparer for NoopPreparer {}

/// Cleaner that keeps every file
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCleaner;

impl DirCleaner for NoopCleaner {}

/// Everything a download needs besides the request itself
#[derive(Clone)]
pub struct DownloadContext {
    pub runner: Arc<dyn CommandRunner>,
    pub narrator: Arc<dyn Narrator>,
    pub manifest_finder: Arc<dyn ManifestFinder>,
    pub source_preparer: Arc<dyn SourcePreparer>,
    pub dir_cleaner: Arc<dyn DirCleaner>,
}

impl Default for DownloadContext {
    fn default() -> Self {
        Self {
            runner: Arc::new(SystemCommandRunner::new()),
            narrator: Arc::new(SilentNarrator),
            manifest_finder: Arc::new(PodspecFinder),
            source_preparer: Arc::new(NoopPreparer),
            dir_cleaner: Arc::new(NoopCleaner),
        }
    }
}

impl DownloadContext {
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn Narrator>) -> Self {
        self.narrator = narrator;
        self
    }

    pub fn with_manifest_finder(mut self, finder: Arc<dyn ManifestFinder>) -> Self {
        self.manifest_finder = finder;
        self
    }

    pub fn with_source_preparer(mut self, preparer: Arc<dyn SourcePreparer>) -> Self {
        self.source_preparer = preparer;
        self
    }

    pub fn with_dir_cleaner(mut self, cleaner: Arc<dyn DirCleaner>) -> Self {
        self.dir_cleaner = cleaner;
        self
    }
}
