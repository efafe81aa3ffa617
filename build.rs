//! Embeds `BUILD_INFO_HUMAN` for `--version` output of both binaries.
//!
//! The string is the package version followed by a git description in
//! parentheses. With tags in reach that is `git describe` verbatim; without
//! them it is `v<version>-<timestamp>-<commit>[+dirty]`, where a clean tree
//! uses the commit time and a dirty one the build time.

use std::process::Command;

use chrono::{DateTime, Utc};

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

fn main() {
    for path in ["src", "build.rs", "Cargo.toml"] {
        println!("cargo:rerun-if-changed={path}");
    }

    let version = env!("CARGO_PKG_VERSION");
    let build_info = match git_version(version) {
        Some(git) => format!("{version} ({git})"),
        None => version.to_string(),
    };
    println!("cargo:rustc-env=BUILD_INFO_HUMAN={build_info}");
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn git_version(version: &str) -> Option<String> {
    let description = git(&["describe", "--tags", "--always", "--dirty"])?;
    if description.contains('v') || description.contains("-g") {
        return Some(description);
    }

    let commit = git(&["rev-parse", "--short=12", "HEAD"])?;
    let dirty = git(&["status", "--porcelain"]).is_some();

    let committed_at = git(&["log", "-1", "--format=%ct"])
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0));
    let timestamp = match committed_at {
        Some(at) if !dirty => at,
        _ => Utc::now(),
    }
    .format(TIMESTAMP_FORMAT);

    let suffix = if dirty { "+dirty" } else { "" };
    Some(format!("v{version}-{timestamp}-{commit}{suffix}"))
}
