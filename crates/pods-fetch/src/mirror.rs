//! Directory mirroring for cache entries.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const EXCLUDED: &str = ".git";

fn is_excluded(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name() == EXCLUDED
}

/// Make `dest` an exact copy of the contents of `source`.
///
/// `.git` directories are neither copied nor deleted. Anything else in
/// `dest` without a counterpart in `source` is removed.
pub fn mirror_dir(source: &Path, dest: &Path) -> io::Result<()> {
    let copied = copy_entries(source, dest, true)?;

    let mut extraneous = Vec::new();
    let mut walker = WalkDir::new(dest).min_depth(1).into_iter();
    while let Some(entry) = walker.next() {
        let entry = entry.map_err(io::Error::other)?;
        if is_excluded(&entry) {
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }

        let relative = entry.path().strip_prefix(dest).map_err(io::Error::other)?;
        if !copied.contains(relative) {
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            extraneous.push(entry.path().to_path_buf());
        }
    }

    for path in extraneous {
        log::trace!("Removing extraneous {}", path.display());
        remove_path(&path)?;
    }

    Ok(())
}

/// Recursively copy `source` into `dest`, replacing what is there
pub fn copy_dir(source: &Path, dest: &Path) -> io::Result<()> {
    if fs::symlink_metadata(dest).is_ok() {
        remove_path(dest)?;
    }
    copy_entries(source, dest, false).map(|_| ())
}

/// Copy every entry, returning the relative paths written
fn copy_entries(source: &Path, dest: &Path, skip_excluded: bool) -> io::Result<HashSet<PathBuf>> {
    fs::create_dir_all(dest)?;
    let mut copied = HashSet::new();

    let walker = WalkDir::new(source)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !(skip_excluded && is_excluded(e)));

    for entry in walker {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry.path().strip_prefix(source).map_err(io::Error::other)?;
        let target = dest.join(relative);
        let file_type = entry.file_type();

        if let Ok(existing) = fs::symlink_metadata(&target) {
            let same_kind = existing.is_dir() == file_type.is_dir() && !existing.file_type().is_symlink();
            if !same_kind || file_type.is_symlink() {
                remove_path(&target)?;
            }
        }

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }

        copied.insert(relative.to_path_buf());
    }

    Ok(copied)
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(link)?, target)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
    fs::copy(link, target).map(|_| ())
}

fn remove_path(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
