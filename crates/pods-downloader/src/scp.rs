//! SCP transfer.

use std::path::Path;
use url::Url;

use crate::command::Invocation;
use crate::{DownloaderError, Result};

const DEFAULT_SSH_PORT: u16 = 22;

/// Build the non-interactive scp invocation for `scp://[user@]host[:port]/path`
pub fn scp_invocation(url: &str, file: &Path) -> Result<Invocation> {
    let parsed = Url::parse(url).map_err(|e| DownloaderError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let host = parsed.host_str().ok_or_else(|| DownloaderError::InvalidUrl {
        url: url.to_string(),
        reason: "missing host".to_string(),
    })?;

    let port = parsed.port().unwrap_or(DEFAULT_SSH_PORT);
    let user = if parsed.username().is_empty() {
        String::new()
    } else {
        format!("{}@", parsed.username())
    };
    let source = format!("{}{}:'{}'", user, host, parsed.path());

    Ok(Invocation::new(
        "scp",
        [
            "-P".to_string(),
            port.to_string(),
            "-q".to_string(),
            source,
            file.to_string_lossy().to_string(),
        ],
    ))
}
