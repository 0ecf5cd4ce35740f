//! Strategy selection from a flat option bag.

use std::path::PathBuf;
use std::sync::Arc;

use crate::command::CommandRunner;
use crate::git::Git;
use crate::narrator::Narrator;
use crate::options::Options;
use crate::strategy::{Strategy, StrategyKind};
use crate::{DownloaderError, Result};

/// The strategy whose trigger key is present, if exactly one is
pub fn strategy_from_options(options: &Options) -> Option<StrategyKind> {
    let mut matches = StrategyKind::all()
        .into_iter()
        .filter(|kind| options.contains_key(kind.trigger()));

    match (matches.next(), matches.next()) {
        (Some(kind), None) => Some(kind),
        _ => None,
    }
}

fn kind_for_options(options: &Options) -> Result<StrategyKind> {
    if options.is_empty() {
        return Err(DownloaderError::NoSource);
    }

    strategy_from_options(options).ok_or_else(|| {
        DownloaderError::UnsupportedStrategy(serde_json::to_string(options).unwrap_or_default())
    })
}

/// Build the strategy selected by `options`, downloading into `target_path`.
///
/// The trigger value becomes the strategy URL; every other key is handed to
/// the strategy and validated there.
pub fn for_target(
    target_path: impl Into<PathBuf>,
    options: &Options,
    runner: Arc<dyn CommandRunner>,
    narrator: Arc<dyn Narrator>,
) -> Result<Strategy> {
    let kind = kind_for_options(options)?;

    let mut sub_options = options.clone();
    let url = sub_options
        .shift_remove(kind.trigger())
        .map(|value| value.to_string())
        .unwrap_or_default();

    Strategy::new(kind, target_path, url, sub_options, runner, narrator)
}

/// Canonicalize options before they are used as a cache key
pub async fn preprocess_options(options: Options, runner: &dyn CommandRunner) -> Result<Options> {
    match kind_for_options(&options)? {
        StrategyKind::Git => Git::preprocess_options(options, runner).await,
        StrategyKind::Http | StrategyKind::Scp => Ok(options),
    }
}
