//! Build identification for the `triad` and `triadd` binaries.
//!
//! Audit records name the model that answered, not the binary, so the
//! binary's own identity only shows up in `--version` and in the daemon's
//! startup log line: `0.1.0 (abc1234, main)`, with `-dirty` after the
//! commit when the tree had local changes.

use std::sync::LazyLock;

pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Branch the binary was built from; "unknown" outside a git checkout.
pub const GIT_BRANCH: &str = match option_env!("VERGEN_GIT_BRANCH") {
    Some(branch) => branch,
    None => "unknown",
};

/// Full commit SHA; "unknown" outside a git checkout.
pub const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};

const SHORT_SHA_LEN: usize = 7;

static VERSION: LazyLock<String> = LazyLock::new(|| {
    format_version(PKG_VERSION, GIT_SHA, GIT_BRANCH, git_dirty())
});

pub fn git_dirty() -> bool {
    option_env!("VERGEN_GIT_DIRTY") == Some("true")
}

/// `{version} ({short sha}[-dirty], {branch})`
pub fn version_string() -> String {
    VERSION.clone()
}

/// Same as [`version_string`], borrowed for clap's `version` attribute.
pub fn long_version() -> &'static str {
    VERSION.as_str()
}

fn format_version(pkg: &str, sha: &str, branch: &str, dirty: bool) -> String {
    let short: String = sha.chars().take(SHORT_SHA_LEN).collect();
    let dirty = if dirty { "-dirty" } else { "" };
    format!("{pkg} ({short}{dirty}, {branch})")
}
