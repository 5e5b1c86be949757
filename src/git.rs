//! Commit and branch of the checkout, for version stamping.

use anyhow::Result;
use std::path::Path;

use crate::process::Cmd;

/// Length the commit hash is shortened to.
const COMMIT_LEN: usize = 14;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitInfo {
    /// Shortened commit hash, with `-dirty` appended for a modified tree.
    pub commit: String,
    /// Active branch name.
    pub branch: String,
}

impl GitInfo {
    /// Read commit, dirty flag and branch of the repository at `repo`.
    ///
    /// Fails outside a repository and on a detached HEAD.
    pub fn read(repo: &Path) -> Result<Self> {
        let head = git(repo, &["rev-parse", "HEAD"])?;
        let mut commit: String = head.chars().take(COMMIT_LEN).collect();

        let status = git(repo, &["status", "--porcelain", "--untracked-files=no"])?;
        if !status.is_empty() {
            commit.push_str("-dirty");
        }

        let branch = git(repo, &["symbolic-ref", "--short", "HEAD"])?;

        Ok(Self { commit, branch })
    }

    /// Like [`GitInfo::read`], but a failure yields empty fields.
    pub fn read_or_default(repo: &Path) -> Self {
        match Self::read(repo) {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!(error = %e, "git information unavailable");
                println!("Could not retrieve information from git: {:#}", e);
                Self::default()
            }
        }
    }
}

fn git(repo: &Path, args: &[&str]) -> Result<String> {
    Cmd::new("git")
        .args(args.iter().copied())
        .current_dir(repo)
        .error_msg("git failed")
        .run()
}
