//! Subprocess execution shared by every strategy.

use async_trait::async_trait;
use std::fmt;
use std::process::Stdio;

use crate::{DownloaderError, Result};

/// A program plus its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<P, I, S>(program: P, args: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Append an argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// First argument, usually the subcommand
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Runs external tools and returns their captured stdout.
///
/// A non-zero exit is an error carrying both output streams.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn execute(&self, invocation: &Invocation) -> Result<String>;
}

/// Runs commands on the host with `tokio::process`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn execute(&self, invocation: &Invocation) -> Result<String> {
        log::debug!("$ {}", invocation);

        let output = tokio::process::Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| DownloaderError::Spawn {
                command: invocation.to_string(),
                source: e,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();

        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut combined = stdout.trim_end().to_string();
        if !stderr.trim().is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(stderr.trim_end());
        }

        Err(DownloaderError::CommandFailed {
            command: invocation.to_string(),
            status: output.status.to_string(),
            output: combined,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_display_quotes_spaces() {
        let invocation = Invocation::new("scp", ["-P", "22", "host:'/a b'"]).arg("");
        assert_eq!(invocation.to_string(), "scp -P 22 'host:'/a b'' ''");
        assert_eq!(invocation.subcommand(), Some("-P"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_captures_stdout() {
        let runner = SystemCommandRunner::new();
        let out = runner
            .execute(&Invocation::new("sh", ["-c", "echo hello"]))
            .await
            .unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_surfaces_stderr_on_failure() {
        let runner = SystemCommandRunner::new();
        let err = runner
            .execute(&Invocation::new("sh", ["-c", "echo out; echo boom >&2; exit 3"]))
            .await
            .unwrap_err();

        match err {
            DownloaderError::CommandFailed { output, .. } => {
                assert!(output.contains("out"));
                assert!(output.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_system_runner_missing_program() {
        let runner = SystemCommandRunner::new();
        let err = runner
            .execute(&Invocation::new("definitely-not-a-real-tool-xyz", Vec::<String>::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloaderError::Spawn { .. }));
    }
}
