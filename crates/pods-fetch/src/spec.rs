//! Read-only view of a pod manifest (podspec JSON).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::path::Path;

use pods_downloader::Options;

use crate::error::{FetchError, Result};

/// Platforms a manifest without a `platforms` entry supports
pub const KNOWN_PLATFORMS: [&str; 5] = ["ios", "osx", "tvos", "visionos", "watchos"];

/// A pod version such as `5.9.1` or `2.0.0-beta.1`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_prerelease(&self) -> bool {
        self.0.contains('-')
    }

    fn parts(&self) -> (&str, Option<&str>) {
        match self.0.split_once('-') {
            Some((release, pre)) => (release, Some(pre)),
            None => (self.0.as_str(), None),
        }
    }
}

fn compare_segment(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Greater,
        (Err(_), Ok(_)) => Ordering::Less,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Dotted comparison; missing trailing segments count as zero
fn compare_dotted(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (l, r) => {
                let ordering = compare_segment(l.unwrap_or("0"), r.unwrap_or("0"));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let (release, pre) = self.parts();
        let (other_release, other_pre) = other.parts();

        compare_dotted(release, other_release).then_with(|| match (pre, other_pre) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => compare_dotted(a, b),
        })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Version {
    fn from(version: &str) -> Self {
        Self::new(version)
    }
}

/// A pod manifest.
///
/// Only the attributes the download layer reads are typed; everything else
/// is carried through untouched so a cached manifest round-trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Options>,

    /// Platform name to deployment target
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub platforms: IndexMap<String, serde_json::Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subspecs: Vec<Specification>,

    #[serde(flatten)]
    pub attributes: IndexMap<String, serde_json::Value>,
}

impl Specification {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            checksum: None,
            source: None,
            platforms: IndexMap::new(),
            subspecs: Vec::new(),
            attributes: IndexMap::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<Version>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_source(mut self, source: Options) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents).map_err(|source| FetchError::ManifestParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Declared platforms, or every known platform when none are declared
    pub fn available_platforms(&self) -> Vec<String> {
        if self.platforms.is_empty() {
            KNOWN_PLATFORMS.iter().map(|p| p.to_string()).collect()
        } else {
            self.platforms.keys().cloned().collect()
        }
    }

    /// Every nested subspec, depth first
    pub fn recursive_subspecs(&self) -> Vec<&Specification> {
        let mut found = Vec::new();
        for subspec in &self.subspecs {
            found.push(subspec);
            found.extend(subspec.recursive_subspecs());
        }
        found
    }
}
