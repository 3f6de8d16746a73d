// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=DEPTHPUB_VERSION");

    // Packaged builds pin the version explicitly
    let version = match std::env::var("DEPTHPUB_VERSION") {
        Ok(v) => v,
        Err(_) => describe_version(),
    };

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// Build a version string of the form `<crate version>-<short hash>`
///
/// Falls back to the bare crate version outside a git checkout.
fn describe_version() -> String {
    let pkg_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());

    let tag = git(&["describe", "--tags", "--exact-match", "--match", "v*"]);
    let base = tag
        .as_deref()
        .map(|t| t.strip_prefix('v').unwrap_or(t).to_string())
        .unwrap_or(pkg_version);

    match git(&["rev-parse", "--short", "HEAD"]) {
        Some(hash) if tag.is_some() => format!("{}-{}", base, hash),
        Some(hash) => format!("{}-dirty-{}", base, hash),
        None => base,
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;

    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        None
    }
}
