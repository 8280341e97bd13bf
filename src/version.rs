//! Build report for `drover version`
//!
//! Values are embedded at compile time by `build.rs`.

use std::fmt;

use serde::Serialize;

use crate::error::Result;

/// What was built, from which commit, and the pool size it defaults to
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub git_branch: &'static str,
    pub dirty: bool,
    pub built_at: &'static str,
    pub target: &'static str,
    pub profile: &'static str,
    pub rustc: &'static str,
    /// Worker threads an executor gets when `worker_threads = 0`
    pub default_workers: usize,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            git_hash: env!("DROVER_GIT_HASH"),
            git_branch: env!("DROVER_GIT_BRANCH"),
            dirty: env!("DROVER_GIT_DIRTY") == "true",
            built_at: env!("DROVER_BUILD_TIMESTAMP"),
            target: env!("DROVER_TARGET"),
            profile: env!("DROVER_PROFILE"),
            rustc: env!("DROVER_RUSTC_VERSION"),
            default_workers: num_cpus::get(),
        }
    }

    /// "0.1.0-abc1234", with "-dirty" for builds from a modified tree
    pub fn full_version(&self) -> String {
        let suffix = if self.dirty { "-dirty" } else { "" };
        format!("{}-{}{}", self.version, self.git_hash, suffix)
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "drover {} ({}, {} build)",
            self.full_version(),
            self.git_branch,
            self.profile
        )?;
        writeln!(f, "  target   {}", self.target)?;
        writeln!(f, "  built    {} with {}", self.built_at, self.rustc)?;
        writeln!(f, "  workers  {} by default (one per CPU)", self.default_workers)
    }
}

/// Get the current build info
pub fn build_info() -> BuildInfo {
    BuildInfo::current()
}

/// Print the build report to stdout, as text or JSON
pub fn print_version(json: bool) -> Result<()> {
    let info = build_info();
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print!("{}", info);
    }
    Ok(())
}
