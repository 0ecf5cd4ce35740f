//! Fetching pods, through the cache or straight into a target directory.

use futures_util::stream::{self, StreamExt};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pods_downloader::{for_target, narrate, preprocess_options, ActionLevel, Options};

use crate::cache::Cache;
use crate::config::Config;
use crate::context::DownloadContext;
use crate::error::{FetchError, Result};
use crate::mirror::copy_dir;
use crate::request::Request;
use crate::response::Response;
use crate::spec::Specification;

/// One entry for [`Downloader::download_many`]
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub request: Request,
    pub target: Option<PathBuf>,
    pub can_cache: bool,
}

impl DownloadJob {
    pub fn new(request: Request, target: impl Into<PathBuf>) -> Self {
        Self {
            request,
            target: Some(target.into()),
            can_cache: true,
        }
    }
}

pub struct Downloader {
    config: Config,
    context: DownloadContext,
    cache: Option<Arc<Cache>>,
}

impl Downloader {
    pub fn new(config: Config, context: DownloadContext) -> Result<Self> {
        let cache = if config.skip_download_cache {
            None
        } else {
            Some(Arc::new(Cache::new(&config.cache_root, &config.version, context.clone())?))
        };

        Ok(Self {
            config,
            context,
            cache,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn context(&self) -> &DownloadContext {
        &self.context
    }

    pub fn cache(&self) -> Option<&Cache> {
        self.cache.as_deref()
    }

    /// Same request with its options canonicalized (git branches pinned)
    pub async fn preprocess_request(&self, request: &Request) -> Result<Request> {
        let params = preprocess_options(request.params().clone(), self.context.runner.as_ref()).await?;
        Ok(request.with_params(params))
    }

    /// Download `request`, leaving a copy at `target` when one is given.
    ///
    /// With caching the response points into the cache; without it a target
    /// is required and the download lands there directly.
    pub async fn download(&self, request: &Request, target: Option<&Path>, can_cache: bool) -> Result<Response> {
        let request = self
            .preprocess_request(request)
            .await
            .map_err(|e| e.for_pod(request.name()))?;

        let result = match self.cache.as_ref().filter(|_| can_cache) {
            Some(cache) => cache.download_pod(&request).await?,
            None => self
                .download_uncached(&request, target)
                .await
                .map_err(|e| e.for_pod(request.name()))?,
        };

        if let (Some(target), Some(location)) = (target, result.location.as_deref()) {
            if target != location {
                let message = format!(
                    "Copying {} from `{}` to {}",
                    request.name(),
                    location.display(),
                    target.display()
                );
                let location = location.to_path_buf();
                let target = target.to_path_buf();
                narrate(self.context.narrator.as_ref(), ActionLevel::Action, &message, async {
                    tokio::task::spawn_blocking(move || {
                        Cache::read_lock(&location, |location| Ok(copy_dir(location, &target)?))
                    })
                    .await?
                })
                .await
                .map_err(|e| e.for_pod(request.name()))?;
            }
        }

        Ok(result)
    }

    async fn download_uncached(&self, request: &Request, target: Option<&Path>) -> Result<Response> {
        let target = target.ok_or_else(|| {
            FetchError::Config("Must provide a `target` when caching is disabled.".to_string())
        })?;

        let (result, _) = download_request(&self.context, request, target).await?;

        let preparer = self.context.source_preparer.clone();
        let spec = result.spec.clone();
        let root = target.to_path_buf();
        tokio::task::spawn_blocking(move || preparer.prepare(spec.as_ref(), &root)).await??;

        Ok(result)
    }

    /// Download several requests concurrently.
    ///
    /// At most `max_concurrent_downloads` run at once; results come back in
    /// job order.
    pub async fn download_many(&self, jobs: Vec<DownloadJob>) -> Vec<Result<Response>> {
        let limit = self.config.max_concurrent_downloads.max(1);

        let mut results: Vec<(usize, Result<Response>)> = stream::iter(jobs.into_iter().enumerate())
            .map(|(index, job)| async move {
                let result = self
                    .download(&job.request, job.target.as_deref(), job.can_cache)
                    .await;
                (index, result)
            })
            .buffer_unordered(limit)
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }
}

/// Fetch the request's source into `target` and collect its manifests.
///
/// Released pods carry their own manifest; for anything else the manifests
/// shipped in the tree are used, with the request's manifest taking
/// precedence for its own name.
pub async fn download_request(
    context: &DownloadContext,
    request: &Request,
    target: &Path,
) -> Result<(Response, IndexMap<String, Specification>)> {
    let checkout_options = download_source(context, target, request.params()).await?;

    let mut podspecs = IndexMap::new();
    if request.is_released() {
        if let Some(spec) = request.spec() {
            podspecs.insert(request.name().to_string(), spec.clone());
        }
    } else {
        let finder = context.manifest_finder.clone();
        let root = target.to_path_buf();
        podspecs = tokio::task::spawn_blocking(move || finder.podspecs(&root)).await??;
        if let Some(spec) = request.spec() {
            podspecs.insert(request.name().to_string(), spec.clone());
        }
    }

    let spec = podspecs.get(request.name()).cloned();
    Ok((Response::new(target, spec, checkout_options), podspecs))
}

/// Run the matching strategy into a fresh `target`.
///
/// Returns `params` when they already pin the download, otherwise the
/// strategy's resolved checkout options.
pub async fn download_source(context: &DownloadContext, target: &Path, params: &Options) -> Result<Options> {
    if tokio::fs::try_exists(target).await? {
        tokio::fs::remove_dir_all(target).await?;
    }

    let strategy = for_target(target, params, context.runner.clone(), context.narrator.clone())?;
    strategy.download().await?;
    tokio::fs::create_dir_all(target).await?;

    if strategy.options_specific() {
        Ok(params.clone())
    } else {
        Ok(strategy.checkout_options().await?)
    }
}
