//! Build script for drover
//!
//! Embeds the git revision, build time and target triple so `drover version`
//! can report exactly which build is running.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let git_hash = command_output("git", &["rev-parse", "--short=8", "HEAD"]);
    let git_branch = command_output("git", &["rev-parse", "--abbrev-ref", "HEAD"]);
    let git_dirty = git_dirty();
    let rustc_version = command_output("rustc", &["--version"]);

    let build_timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=DROVER_GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=DROVER_GIT_BRANCH={}", git_branch);
    println!("cargo:rustc-env=DROVER_GIT_DIRTY={}", git_dirty);
    println!("cargo:rustc-env=DROVER_BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=DROVER_TARGET={}", target);
    println!("cargo:rustc-env=DROVER_PROFILE={}", profile);
    println!("cargo:rustc-env=DROVER_RUSTC_VERSION={}", rustc_version);
}

/// Run a command and return its trimmed stdout, or "unknown"
fn command_output(program: &str, args: &[&str]) -> String {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// "true" when the working tree has uncommitted changes
fn git_dirty() -> &'static str {
    match Command::new("git").args(["status", "--porcelain"]).output() {
        Ok(output) if output.status.success() => {
            if output.stdout.is_empty() {
                "false"
            } else {
                "true"
            }
        }
        _ => "unknown",
    }
}
