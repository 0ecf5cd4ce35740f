//! Git strategy, driving the `git` command line.

use regex::Regex;
use std::sync::OnceLock;

use crate::command::{CommandRunner, Invocation};
use crate::options::{flag_option, string_option, Options};
use crate::strategy::Base;
use crate::{DownloaderError, Result, Scalar};

fn shallow_unsupported_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?m)^fatal:.*does not support (--depth|shallow capabilities)\s*$")
            .expect("shallow clone regex is valid")
    })
}

/// Whether a value could be parsed by git as a flag
fn looks_like_flag(value: &str) -> bool {
    value.starts_with("--") || value.contains(" --")
}

/// Git repository strategy
pub struct Git {
    base: Base,
}

impl Git {
    pub(crate) fn new(base: Base) -> Self {
        Self { base }
    }

    pub(crate) fn base(&self) -> &Base {
        &self.base
    }

    /// Pin a floating request to the `commit` its ref currently points at.
    ///
    /// A `branch` is resolved through its head or tag, a request naming no
    /// ref through the remote `HEAD`. Options come back unchanged when a
    /// commit or tag is already given, or the remote has no such ref.
    pub async fn preprocess_options(mut options: Options, runner: &dyn CommandRunner) -> Result<Options> {
        if string_option(&options, "commit").is_some() || string_option(&options, "tag").is_some() {
            return Ok(options);
        }

        let unsafe_input = ["git", "branch"]
            .iter()
            .filter_map(|key| options.get(*key))
            .any(|value| looks_like_flag(&value.to_string()));
        if unsafe_input {
            return Err(DownloaderError::UnsafeInput(
                serde_json::to_string(&options).unwrap_or_default(),
            ));
        }

        let Some(repository) = string_option(&options, "git").map(str::to_string) else {
            return Ok(options);
        };
        let branch = string_option(&options, "branch").map(str::to_string);
        let reference = branch.clone().unwrap_or_else(|| "HEAD".to_string());

        let output = runner
            .execute(&Invocation::new(
                "git",
                ["ls-remote".to_string(), "--".to_string(), repository, reference.clone()],
            ))
            .await?;

        let commit = match &branch {
            Some(branch) => Self::commit_from_ls_remote(&output, branch),
            None => Self::head_from_ls_remote(&output),
        };

        match commit {
            Some(commit) => {
                log::debug!("Resolved {} to {}", reference, commit);
                options.shift_remove("branch");
                options.insert("commit".to_string(), Scalar::String(commit));
            }
            None => log::debug!("{} not found on remote, leaving it floating", reference),
        }

        Ok(options)
    }

    /// Find the hash of `refs/heads/<branch>` or `refs/tags/<branch>`
    pub fn commit_from_ls_remote(output: &str, branch: &str) -> Option<String> {
        let pattern = format!(
            r"(?m)^([a-z0-9]*)\trefs/(heads|tags)/{}\s*$",
            regex::escape(branch)
        );
        let regex = Regex::new(&pattern).ok()?;
        regex
            .captures(output)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Find the hash the remote `HEAD` points at
    pub fn head_from_ls_remote(output: &str) -> Option<String> {
        output.lines().find_map(|line| {
            let (hash, reference) = line.split_once('\t')?;
            (reference.trim() == "HEAD" && !hash.is_empty()).then(|| hash.to_string())
        })
    }

    fn commit(&self) -> Option<&str> {
        string_option(self.base.options(), "commit")
    }

    fn tag_or_branch(&self) -> Option<&str> {
        string_option(self.base.options(), "tag")
            .or_else(|| string_option(self.base.options(), "branch"))
    }

    fn submodules(&self) -> bool {
        flag_option(self.base.options(), "submodules")
    }

    pub(crate) async fn perform_download(&self) -> Result<()> {
        self.clone_repository(false).await?;
        if let Some(commit) = self.commit() {
            self.checkout_commit(commit).await?;
        }
        Ok(())
    }

    pub(crate) async fn perform_download_head(&self) -> Result<()> {
        self.clone_repository(true).await
    }

    /// `{git, commit, submodules}` with the commit read back from HEAD
    pub(crate) async fn checkout_options(&self) -> Result<Options> {
        let head = self.target_git(["rev-parse", "HEAD"]).await?;

        let mut options = Options::new();
        options.insert("git".to_string(), Scalar::from(self.base.url()));
        options.insert("commit".to_string(), Scalar::String(head.trim().to_string()));
        options.insert("submodules".to_string(), Scalar::Bool(self.submodules()));
        Ok(options)
    }

    /// Only an explicit commit or tag reproduces the same tree
    pub(crate) fn options_specific(&self) -> bool {
        self.commit().is_some() || string_option(self.base.options(), "tag").is_some()
    }

    async fn clone_repository(&self, force_head: bool) -> Result<()> {
        self.base
            .sub_action("Git download", async {
                match self.run_clone(force_head, true).await {
                    Ok(()) => Ok(()),
                    Err(e) if shallow_unsupported_regex().is_match(&e.to_string()) => {
                        log::debug!("Remote rejected a shallow clone, retrying with full history");
                        self.run_clone(force_head, false).await
                    }
                    Err(e) => Err(e),
                }
            })
            .await
    }

    async fn run_clone(&self, force_head: bool, shallow: bool) -> Result<()> {
        self.base
            .runner()
            .execute(&self.clone_invocation(force_head, shallow))
            .await?;
        self.update_submodules().await
    }

    pub(crate) fn clone_invocation(&self, force_head: bool, shallow: bool) -> Invocation {
        let mut invocation = Invocation::new("git", ["clone", "--template="]);

        if shallow && self.commit().is_none() {
            invocation = invocation.arg("--single-branch").arg("--depth").arg("1");
        }

        if !force_head {
            if let Some(reference) = self.tag_or_branch() {
                invocation = invocation.arg("--branch").arg(reference);
            }
        }

        invocation
            .arg("--")
            .arg(self.base.url())
            .arg(self.base.target_path().to_string_lossy())
    }

    async fn checkout_commit(&self, commit: &str) -> Result<()> {
        self.base
            .sub_action(&format!("Checking out {}", commit), async {
                self.target_git(["checkout", "--quiet", commit]).await?;
                self.update_submodules().await
            })
            .await
    }

    async fn update_submodules(&self) -> Result<()> {
        if self.submodules() {
            self.target_git(["submodule", "update", "--init", "--recursive"])
                .await?;
        }
        Ok(())
    }

    async fn target_git<'a, I>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let invocation = Invocation::new(
            "git",
            ["-C".to_string(), self.base.target_path().to_string_lossy().to_string()],
        );
        let invocation = args.into_iter().fold(invocation, |inv, arg| inv.arg(arg));
        self.base.runner().execute(&invocation).await
    }
}
