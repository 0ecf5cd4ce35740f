//! Remote archive strategy shared by the HTTP and SCP transfers.
//!
//! Whatever the transfer, the downloaded file goes through the same steps:
//! type resolution, checksum verification, extraction, optional flattening
//! and removal of the archive.

use std::path::Path;

use crate::archive::{flatten_single_directory, ArchiveExtractor, ArchiveType};
use crate::checksum::{expected_checksum, verify_checksum};
use crate::http::curl_invocation;
use crate::options::{string_option, Options};
use crate::scp::scp_invocation;
use crate::strategy::{Base, StrategyKind};
use crate::{DownloaderError, Result, Scalar};

/// Archive downloaded over HTTP or SCP
pub struct RemoteFile {
    base: Base,
}

impl RemoteFile {
    pub(crate) fn new(base: Base) -> Self {
        Self { base }
    }

    pub(crate) fn base(&self) -> &Base {
        &self.base
    }

    /// Explicit `type` option, else inferred from the URL
    pub fn archive_type(&self) -> Result<ArchiveType> {
        match string_option(self.base.options(), "type") {
            Some(name) => ArchiveType::from_name(name)
                .ok_or_else(|| DownloaderError::UnsupportedFileType(name.to_string())),
            None => ArchiveType::from_url(self.base.url())
                .ok_or_else(|| DownloaderError::UnsupportedFileType(self.base.url().to_string())),
        }
    }

    /// Explicit `flatten` option, else the archive type's default
    pub fn should_flatten(&self, archive_type: ArchiveType) -> bool {
        match self.base.options().get("flatten") {
            Some(Scalar::Bool(flatten)) => *flatten,
            Some(Scalar::String(flatten)) => flatten == "true",
            _ => archive_type.flattens_by_default(),
        }
    }

    /// Archives are never re-resolved to anything more specific
    pub(crate) fn checkout_options(&self) -> Options {
        Options::new()
    }

    pub(crate) async fn perform_download(&self) -> Result<()> {
        let archive_type = self.archive_type()?;
        let file_name = archive_type.file_name();
        let target = self.base.target_path();
        let download_path = target.join(&file_name);

        self.base
            .sub_action(&format!("Downloading {}", self.base.url()), self.download_file(&download_path))
            .await?;

        if let Some((checksum_type, expected)) = expected_checksum(self.base.options()) {
            let verified = self
                .base
                .sub_action(
                    "Verifying checksum",
                    verify_checksum(&download_path, expected, checksum_type),
                )
                .await;
            if let Err(e) = verified {
                let _ = tokio::fs::remove_file(&download_path).await;
                return Err(e);
            }
        }

        self.base
            .sub_action(
                &format!("Extracting {}", file_name),
                ArchiveExtractor::new(self.base.runner()).extract(&download_path, target, archive_type),
            )
            .await?;

        // extracted entries may share the archive's name
        if tokio::fs::try_exists(&download_path).await? {
            tokio::fs::remove_file(&download_path).await?;
        }

        if self.should_flatten(archive_type) {
            let target = target.to_path_buf();
            let flattened = tokio::task::spawn_blocking(move || flatten_single_directory(&target))
                .await
                .map_err(|e| DownloaderError::Io(std::io::Error::other(e)))??;
            if flattened {
                log::debug!("Flattened single top-level directory of {}", file_name);
            }
        }

        Ok(())
    }

    async fn download_file(&self, file: &Path) -> Result<()> {
        let invocation = match self.base.kind() {
            StrategyKind::Scp => scp_invocation(self.base.url(), file)?,
            _ => curl_invocation(self.base.url(), file, self.base.options()),
        };
        self.base.runner().execute(&invocation).await?;
        Ok(())
    }
}
