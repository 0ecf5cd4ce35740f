//! Checksum verification for downloaded files.

use sha1::Sha1;
use sha2::digest::Output;
use sha2::{Digest, Sha256};
use std::fmt::LowerHex;
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::options::{string_option, Options};
use crate::{DownloaderError, Result};

const CHUNK_SIZE: usize = 64 * 1024;

/// Supported checksum types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumType {
    Sha1,
    Sha256,
}

impl ChecksumType {
    /// Name of the algorithm, also the option key that carries it
    pub fn name(&self) -> &'static str {
        match self {
            ChecksumType::Sha1 => "sha1",
            ChecksumType::Sha256 => "sha256",
        }
    }
}

/// The checksum to verify, if any. `sha256` wins over `sha1`.
pub fn expected_checksum(options: &Options) -> Option<(ChecksumType, &str)> {
    if let Some(hash) = string_option(options, "sha256") {
        return Some((ChecksumType::Sha256, hash));
    }
    string_option(options, "sha1").map(|hash| (ChecksumType::Sha1, hash))
}

/// Stream a file through the hasher and return the hex digest
pub async fn compute_checksum(path: &Path, checksum_type: ChecksumType) -> Result<String> {
    match checksum_type {
        ChecksumType::Sha1 => hash_file::<Sha1>(path).await,
        ChecksumType::Sha256 => hash_file::<Sha256>(path).await,
    }
}

async fn hash_file<D>(path: &Path) -> Result<String>
where
    D: Digest,
    Output<D>: LowerHex,
{
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = D::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Verify checksum of a file, failing with both digests on mismatch
pub async fn verify_checksum(path: &Path, expected: &str, checksum_type: ChecksumType) -> Result<()> {
    let actual = compute_checksum(path, checksum_type).await?;

    if actual.eq_ignore_ascii_case(expected.trim()) {
        log::debug!("{} checksum verified for {}", checksum_type.name(), path.display());
        return Ok(());
    }

    Err(DownloaderError::ChecksumMismatch {
        algorithm: checksum_type.name(),
        expected: expected.to_string(),
        actual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::options_from;
    use crate::Scalar;
    use tempfile::NamedTempFile;
    use tokio::io::AsyncWriteExt;

    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";
    const HELLO_SHA1: &str = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";

    async fn hello_file() -> NamedTempFile {
        let temp_file = NamedTempFile::new().unwrap();
        let mut file = tokio::fs::File::create(temp_file.path()).await.unwrap();
        file.write_all(b"hello world").await.unwrap();
        file.flush().await.unwrap();
        temp_file
    }

    #[tokio::test]
    async fn test_verify_sha256() {
        let file = hello_file().await;
        verify_checksum(file.path(), HELLO_SHA256, ChecksumType::Sha256)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_verify_sha1_uppercase() {
        let file = hello_file().await;
        verify_checksum(file.path(), &HELLO_SHA1.to_uppercase(), ChecksumType::Sha1)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_compute_checksum_is_lowercase_hex() {
        let file = hello_file().await;
        assert_eq!(
            compute_checksum(file.path(), ChecksumType::Sha256).await.unwrap(),
            HELLO_SHA256
        );
        assert_eq!(
            compute_checksum(file.path(), ChecksumType::Sha1).await.unwrap(),
            HELLO_SHA1
        );
    }

    #[tokio::test]
    async fn test_verify_sha256_mismatch() {
        let file = hello_file().await;
        let wrong_hash = "0".repeat(64);

        let err = verify_checksum(file.path(), &wrong_hash, ChecksumType::Sha256)
            .await
            .unwrap_err();

        match err {
            DownloaderError::ChecksumMismatch { algorithm, expected, actual } => {
                assert_eq!(algorithm, "sha256");
                assert_eq!(expected, wrong_hash);
                assert_eq!(actual, HELLO_SHA256);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_expected_checksum_prefers_sha256() {
        let options = options_from([
            ("sha1", Scalar::from(HELLO_SHA1)),
            ("sha256", Scalar::from(HELLO_SHA256)),
        ]);
        assert_eq!(
            expected_checksum(&options),
            Some((ChecksumType::Sha256, HELLO_SHA256))
        );

        let options = options_from([("sha1", Scalar::from(HELLO_SHA1))]);
        assert_eq!(expected_checksum(&options), Some((ChecksumType::Sha1, HELLO_SHA1)));

        assert_eq!(expected_checksum(&Options::new()), None);
    }
}
