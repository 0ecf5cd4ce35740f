//! HTTP(S) transfer through curl.

use std::path::Path;

use crate::command::Invocation;
use crate::options::Options;
use crate::strategy::user_agent_string;

/// Build the curl invocation that fetches `url` into `file`
pub fn curl_invocation(url: &str, file: &Path, options: &Options) -> Invocation {
    let mut invocation = Invocation::new(
        "curl",
        [
            "-f".to_string(),
            "-L".to_string(),
            "-o".to_string(),
            file.to_string_lossy().to_string(),
            url.to_string(),
            "--create-dirs".to_string(),
            "--netrc-optional".to_string(),
            "--retry".to_string(),
            "2".to_string(),
        ],
    );

    let headers = options.get("headers").map(|h| h.to_list()).unwrap_or_default();

    let has_user_agent = headers
        .iter()
        .any(|header| header.to_lowercase().contains("user-agent"));
    if !has_user_agent {
        invocation = invocation.arg("-A").arg(user_agent_string());
    }

    for header in headers {
        invocation = invocation.arg("-H").arg(header);
    }

    invocation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::options_from;
    use crate::Scalar;

    #[test]
    fn test_curl_invocation_defaults() {
        let invocation = curl_invocation(
            "https://example.com/pkg.zip",
            Path::new("/tmp/t/file.zip"),
            &Options::new(),
        );

        assert_eq!(invocation.program, "curl");
        assert_eq!(
            &invocation.args[..9],
            &[
                "-f",
                "-L",
                "-o",
                "/tmp/t/file.zip",
                "https://example.com/pkg.zip",
                "--create-dirs",
                "--netrc-optional",
                "--retry",
                "2"
            ]
        );
        assert_eq!(invocation.args[9], "-A");
        assert_eq!(invocation.args[10], user_agent_string());
    }

    #[test]
    fn test_curl_invocation_headers() {
        let options = options_from([(
            "headers",
            Scalar::List(vec!["Accept: application/zip".to_string(), "X-Token: 1".to_string()]),
        )]);
        let invocation = curl_invocation("https://example.com/a.zip", Path::new("f"), &options);

        let tail: Vec<_> = invocation.args[9..].to_vec();
        assert_eq!(tail[0], "-A");
        assert_eq!(
            &tail[2..],
            &["-H", "Accept: application/zip", "-H", "X-Token: 1"]
        );
    }

    #[test]
    fn test_curl_invocation_keeps_caller_user_agent() {
        let options = options_from([(
            "headers",
            Scalar::List(vec!["User-Agent: custom/1.0".to_string()]),
        )]);
        let invocation = curl_invocation("https://example.com/a.zip", Path::new("f"), &options);

        assert!(!invocation.args.iter().any(|a| a == "-A"));
        assert_eq!(&invocation.args[9..], &["-H", "User-Agent: custom/1.0"]);
    }
}
