//! Disk cache of downloaded pods
//!
//! Layout under the cache root:
//!
//! ```text
//! VERSION                                  version that created the cache
//! Release/{name}/{version}[-{chk}]/        released pods
//! External/{name}/{digest}[-{chk}]/        pods from arbitrary sources
//! Specs/{slug}.manifest.json               manifest of each entry
//! ```
//!
//! Entries are written under an exclusive lock and read under a shared
//! one, so several processes can share a cache root.

use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::context::{DownloadContext, SpecsByPlatform};
use crate::downloader::download_request;
use crate::error::{FetchError, Result};
use crate::lock::{with_lock, LockMode};
use crate::mirror::mirror_dir;
use crate::request::Request;
use crate::response::Response;
use crate::spec::{Specification, Version};

const VERSION_FILE: &str = "VERSION";
const SPECS_DIR: &str = "Specs";
const MANIFEST_SUFFIX: &str = ".manifest.json";

/// A cached pod, as listed by [`Cache::cache_descriptors_per_pod`]
#[derive(Debug, Clone, PartialEq)]
pub struct CacheDescriptor {
    /// Manifest file of the entry
    pub spec_file: PathBuf,
    pub name: String,
    pub version: Option<Version>,
    pub release: bool,
    /// Entry directory
    pub slug: PathBuf,
}

pub struct Cache {
    root: PathBuf,
    context: DownloadContext,
}

impl Cache {
    /// Open the cache at `root`, wiping it if another version created it
    pub fn new(root: impl Into<PathBuf>, version: &str, context: DownloadContext) -> Result<Self> {
        let root = root.into();
        ensure_matching_version(&root, version)?;
        Ok(Self { root, context })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cached copy of the request, downloading it first on a miss
    pub async fn download_pod(&self, request: &Request) -> Result<Response> {
        let result = match self.cached_pod(request) {
            Some(response) => Ok(response),
            None => self.uncached_pod(request).await,
        };

        result.map_err(|e| {
            log::error!("Error installing {}", request.name());
            e.for_pod(request.name())
        })
    }

    /// Entry for the request, if both its manifest and directory exist
    pub fn cached_pod(&self, request: &Request) -> Option<Response> {
        let cached_spec = self.cached_spec(request)?;
        let path = self.path_for_pod(&request.slug());
        if !path.is_dir() {
            return None;
        }

        log::debug!("Cache hit for {} at {}", request.name(), path.display());
        let spec = request.spec().cloned().unwrap_or(cached_spec);
        Some(Response::new(path, Some(spec), request.params().clone()))
    }

    fn cached_spec(&self, request: &Request) -> Option<Specification> {
        let path = self.path_for_spec(&request.slug());
        if !path.is_file() {
            return None;
        }

        match Specification::from_file(&path) {
            Ok(spec) => Some(spec),
            Err(e) => {
                log::debug!("Ignoring unreadable cached manifest: {}", e);
                None
            }
        }
    }

    /// Download into a scratch directory and file every manifest found there
    pub async fn uncached_pod(&self, request: &Request) -> Result<Response> {
        log::debug!("Cache miss for {}", request.name());
        let scratch = tempfile::Builder::new().prefix("pod-").tempdir()?;

        let (mut result, podspecs) = download_request(&self.context, request, scratch.path()).await?;
        result.location = None;

        for (name, spec) in podspecs {
            let slug = request.slug_for(&name, &result.checkout_options);
            let destination = self.path_for_pod(&slug);

            self.copy_and_clean(scratch.path(), &destination, &spec).await?;
            self.write_spec(&spec, &self.path_for_spec(&slug)).await?;

            if name == request.name() {
                result.location = Some(destination);
            }
        }

        if result.location.is_none() {
            return Err(FetchError::InvalidRequest(format!(
                "No manifest named {} found in the downloaded source",
                request.name()
            )));
        }

        Ok(result)
    }

    /// Mirror `source` into `destination`, then run the prepare and clean hooks
    async fn copy_and_clean(&self, source: &Path, destination: &Path, spec: &Specification) -> Result<()> {
        let specs_by_platform = group_subspecs_by_platform(spec);
        let source = source.to_path_buf();
        let destination = destination.to_path_buf();
        let spec = spec.clone();
        let preparer = self.context.source_preparer.clone();
        let cleaner = self.context.dir_cleaner.clone();

        tokio::task::spawn_blocking(move || {
            Cache::write_lock(&destination, |destination| {
                mirror_dir(&source, destination)?;
                preparer.prepare(Some(&spec), destination)?;
                cleaner.clean(destination, &specs_by_platform)
            })
        })
        .await?
    }

    async fn write_spec(&self, spec: &Specification, path: &Path) -> Result<()> {
        let json = spec.to_pretty_json()?;
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            Cache::write_lock(&path, |path| Ok(fs::write(path, json)?))
        })
        .await?
    }

    /// Every cached entry, grouped by pod name.
    ///
    /// Manifests that fail to parse are skipped.
    pub fn cache_descriptors_per_pod(&self) -> Result<IndexMap<String, Vec<CacheDescriptor>>> {
        let specs_dir = self.root.join(SPECS_DIR);
        let mut descriptors: IndexMap<String, Vec<CacheDescriptor>> = IndexMap::new();
        if !specs_dir.is_dir() {
            return Ok(descriptors);
        }

        for entry in WalkDir::new(&specs_dir).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::other)?;
            let file_name = entry.file_name().to_string_lossy();
            if !entry.file_type().is_file() || !file_name.ends_with(MANIFEST_SUFFIX) {
                continue;
            }

            let spec = match Specification::from_file(entry.path()) {
                Ok(spec) => spec,
                Err(e) => {
                    log::warn!("Skipping cached manifest {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            let Ok(relative) = entry.path().strip_prefix(&specs_dir) else {
                continue;
            };
            let relative = relative.to_string_lossy();
            let slug = relative.trim_end_matches(MANIFEST_SUFFIX);

            descriptors
                .entry(spec.name.clone())
                .or_default()
                .push(CacheDescriptor {
                    spec_file: entry.path().to_path_buf(),
                    name: spec.name,
                    version: spec.version,
                    release: relative.starts_with("Release"),
                    slug: self.root.join(slug),
                });
        }

        Ok(descriptors)
    }

    /// Delete an entry and its manifest
    pub fn remove(&self, descriptor: &CacheDescriptor) -> Result<()> {
        Cache::write_lock(&descriptor.slug, |slug| {
            if slug.exists() {
                fs::remove_dir_all(slug)?;
            }
            Ok(())
        })?;

        Cache::write_lock(&descriptor.spec_file, |spec_file| {
            if spec_file.exists() {
                fs::remove_file(spec_file)?;
            }
            Ok(())
        })
    }

    /// Run `f` while holding a shared lock on `location`
    pub fn read_lock<T>(location: &Path, f: impl FnOnce(&Path) -> Result<T>) -> Result<T> {
        with_lock(location, LockMode::Shared, f)
    }

    /// Run `f` while holding an exclusive lock on `location`
    pub fn write_lock<T>(location: &Path, f: impl FnOnce(&Path) -> Result<T>) -> Result<T> {
        with_lock(location, LockMode::Exclusive, f)
    }

    fn path_for_pod(&self, slug: &str) -> PathBuf {
        self.root.join(slug)
    }

    fn path_for_spec(&self, slug: &str) -> PathBuf {
        self.root.join(SPECS_DIR).join(format!("{}{}", slug, MANIFEST_SUFFIX))
    }
}

fn ensure_matching_version(root: &Path, version: &str) -> Result<()> {
    let version_file = root.join(VERSION_FILE);
    let existing = if version_file.is_file() {
        Some(fs::read_to_string(&version_file)?.trim().to_string())
    } else {
        None
    };

    if existing.as_deref() != Some(version) && root.exists() {
        log::info!(
            "Cache at {} was created by version {}, clearing it",
            root.display(),
            existing.as_deref().unwrap_or("unknown")
        );
        fs::remove_dir_all(root)?;
    }

    fs::create_dir_all(root)?;
    fs::write(&version_file, version)?;
    Ok(())
}

/// The pod and its subspecs, grouped by each platform they support
pub fn group_subspecs_by_platform(spec: &Specification) -> SpecsByPlatform {
    let mut by_platform = SpecsByPlatform::new();
    for subspec in std::iter::once(spec).chain(spec.recursive_subspecs()) {
        for platform in subspec.available_platforms() {
            by_platform.entry(platform).or_default().push(subspec.clone());
        }
    }
    by_platform
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_version_gate_keeps_matching_cache() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("Pods");
        Cache::new(&root, "1.0.0", DownloadContext::default()).unwrap();
        fs::write(root.join("entry"), "kept").unwrap();

        Cache::new(&root, "1.0.0", DownloadContext::default()).unwrap();
        assert!(root.join("entry").exists());
    }

    #[test]
    fn test_version_gate_wipes_other_versions() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("Pods");
        fs::create_dir_all(root.join("Release/A/1.0")).unwrap();
        fs::write(root.join(VERSION_FILE), "0.9.0\n").unwrap();

        Cache::new(&root, "1.0.0", DownloadContext::default()).unwrap();
        assert!(!root.join("Release").exists());
        assert_eq!(fs::read_to_string(root.join(VERSION_FILE)).unwrap(), "1.0.0");
    }

    #[test]
    fn test_version_gate_wipes_unstamped_cache() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("Pods");
        fs::create_dir_all(root.join("junk")).unwrap();

        Cache::new(&root, "1.0.0", DownloadContext::default()).unwrap();
        assert!(!root.join("junk").exists());
    }

    #[test]
    fn test_group_subspecs_by_platform() {
        let spec = Specification::from_json(
            r#"{
                "name": "A",
                "platforms": { "ios": "12.0", "osx": "10.13" },
                "subspecs": [ { "name": "Mobile", "platforms": { "ios": "12.0" } } ]
            }"#,
        )
        .unwrap();

        let grouped = group_subspecs_by_platform(&spec);
        let names = |platform: &str| -> Vec<String> {
            grouped[platform].iter().map(|s| s.name.clone()).collect()
        };
        assert_eq!(names("ios"), vec!["A", "Mobile"]);
        assert_eq!(names("osx"), vec!["A"]);
        assert!(!grouped.contains_key("tvos"));
    }

    #[test]
    fn test_cached_pod_requires_manifest_and_directory() {
        let temp = TempDir::new().unwrap();
        let cache = Cache::new(temp.path().join("Pods"), "1.0.0", DownloadContext::default()).unwrap();
        let spec = Specification::new("A")
            .with_version("1.0")
            .with_source(pods_downloader::options_from([(
                "http",
                pods_downloader::Scalar::from("https://example.com/a.zip"),
            )]));
        let request = Request::released(spec.clone()).unwrap();

        assert!(cache.cached_pod(&request).is_none());

        let spec_path = cache.path_for_spec(&request.slug());
        fs::create_dir_all(spec_path.parent().unwrap()).unwrap();
        fs::write(&spec_path, spec.to_pretty_json().unwrap()).unwrap();
        assert!(cache.cached_pod(&request).is_none());

        fs::create_dir_all(cache.path_for_pod(&request.slug())).unwrap();
        let response = cache.cached_pod(&request).unwrap();
        assert_eq!(response.location, Some(cache.root().join("Release/A/1.0")));
        assert_eq!(response.checkout_options, *request.params());

        fs::write(&spec_path, "{ broken").unwrap();
        assert!(cache.cached_pod(&request).is_none());
    }
}
