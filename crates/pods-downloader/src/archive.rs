//! Archive type detection, extraction and flattening.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

use crate::command::{CommandRunner, Invocation};
use crate::{DownloaderError, Result};

fn mount_point_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"<key>\s*mount-point\s*</key>\s*<string>([^<]+)</string>")
            .expect("mount point regex is valid")
    })
}

/// Supported archive types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    Zip,
    Tgz,
    Tar,
    Tbz,
    Txz,
    Dmg,
}

impl ArchiveType {
    /// Parse the value of the `type` option
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "zip" => Some(ArchiveType::Zip),
            "tgz" => Some(ArchiveType::Tgz),
            "tar" => Some(ArchiveType::Tar),
            "tbz" => Some(ArchiveType::Tbz),
            "txz" => Some(ArchiveType::Txz),
            "dmg" => Some(ArchiveType::Dmg),
            _ => None,
        }
    }

    /// Detect archive type from the path component of a URL
    pub fn from_url(url: &str) -> Option<Self> {
        let path = url::Url::parse(url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| url.to_string());

        if path.ends_with(".zip") {
            Some(ArchiveType::Zip)
        } else if path.ends_with(".tgz") || path.ends_with(".tar.gz") {
            Some(ArchiveType::Tgz)
        } else if path.ends_with(".tar") {
            Some(ArchiveType::Tar)
        } else if path.ends_with(".tbz") || path.ends_with(".tbz2") || path.ends_with(".tar.bz2") {
            Some(ArchiveType::Tbz)
        } else if path.ends_with(".txz") || path.ends_with(".tar.xz") {
            Some(ArchiveType::Txz)
        } else if path.ends_with(".dmg") {
            Some(ArchiveType::Dmg)
        } else {
            None
        }
    }

    /// Short name, also used as the downloaded file's extension
    pub fn name(&self) -> &'static str {
        match self {
            ArchiveType::Zip => "zip",
            ArchiveType::Tgz => "tgz",
            ArchiveType::Tar => "tar",
            ArchiveType::Tbz => "tbz",
            ArchiveType::Txz => "txz",
            ArchiveType::Dmg => "dmg",
        }
    }

    /// File name the archive is downloaded to
    pub fn file_name(&self) -> String {
        format!("file.{}", self.name())
    }

    pub fn is_tar_family(&self) -> bool {
        matches!(
            self,
            ArchiveType::Tgz | ArchiveType::Tar | ArchiveType::Tbz | ArchiveType::Txz
        )
    }

    /// Tarballs flatten unless told otherwise; zips and disk images do not.
    pub fn flattens_by_default(&self) -> bool {
        self.is_tar_family()
    }
}

/// Archive extractor
pub struct ArchiveExtractor<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> ArchiveExtractor<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Extract an archive into `dest_dir` with the matching tool
    pub async fn extract(&self, archive: &Path, dest_dir: &Path, archive_type: ArchiveType) -> Result<()> {
        fs::create_dir_all(dest_dir)?;

        let from = archive.to_string_lossy().to_string();
        let to = dest_dir.to_string_lossy().to_string();

        match archive_type {
            ArchiveType::Zip => {
                self.runner
                    .execute(&Invocation::new("unzip", [from, "-d".to_string(), to]))
                    .await?;
            }
            ArchiveType::Tar | ArchiveType::Tgz | ArchiveType::Tbz | ArchiveType::Txz => {
                self.runner
                    .execute(&Invocation::new("tar", ["xf".to_string(), from, "-C".to_string(), to]))
                    .await?;
            }
            ArchiveType::Dmg => self.extract_dmg(archive, dest_dir).await?,
        }

        Ok(())
    }

    /// Mount the image, copy every top-level entry out, then detach.
    async fn extract_dmg(&self, archive: &Path, dest_dir: &Path) -> Result<()> {
        let plist = self
            .runner
            .execute(&Invocation::new(
                "hdiutil",
                [
                    "attach".to_string(),
                    "-plist".to_string(),
                    "-nobrowse".to_string(),
                    "-readonly".to_string(),
                    archive.to_string_lossy().to_string(),
                    "-mountrandom".to_string(),
                    dest_dir.to_string_lossy().to_string(),
                ],
            ))
            .await?;

        let mount_point = parse_mount_point(&plist).ok_or(DownloaderError::MissingMountPoint)?;

        let copied = copy_top_level_entries(&mount_point, dest_dir);

        self.runner
            .execute(&Invocation::new(
                "hdiutil",
                ["detach".to_string(), mount_point.to_string_lossy().to_string()],
            ))
            .await?;

        copied
    }
}

/// Read the `mount-point` value out of `hdiutil attach -plist` output
pub fn parse_mount_point(plist: &str) -> Option<PathBuf> {
    mount_point_regex()
        .captures(plist)
        .and_then(|c| c.get(1))
        .map(|m| PathBuf::from(m.as_str().trim()))
}

fn copy_top_level_entries(source: &Path, dest_dir: &Path) -> Result<()> {
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let target = dest_dir.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;

    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(|e| DownloaderError::Io(e.into()))?;
        let path = entry.path();
        let relative = path.strip_prefix(source).unwrap_or(path);
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_symlink() {
            #[cfg(unix)]
            std::os::unix::fs::symlink(fs::read_link(path)?, &target)?;
        } else {
            fs::copy(path, &target)?;
        }
    }

    Ok(())
}

/// Hoist the contents of a lone top-level directory into `dest_dir`.
///
/// Returns whether anything was moved.
pub fn flatten_single_directory(dest_dir: &Path) -> Result<bool> {
    let mut contents = fs::read_dir(dest_dir)?.collect::<std::io::Result<Vec<_>>>()?;

    if contents.len() != 1 || !contents[0].file_type()?.is_dir() {
        return Ok(false);
    }

    let entry = contents.remove(0);
    let staging = tempfile::Builder::new()
        .prefix(".flatten-")
        .tempdir_in(dest_dir)?;
    let moved = staging.path().join(entry.file_name());
    fs::rename(entry.path(), &moved)?;

    for child in fs::read_dir(&moved)? {
        let child = child?;
        fs::rename(child.path(), dest_dir.join(child.file_name()))?;
    }

    staging.close()?;
    Ok(true)
}
