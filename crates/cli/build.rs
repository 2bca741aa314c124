//! Build script for the pointscore CLI
//!
//! Writes `built.rs` (package, target and rustc metadata) and exports the
//! values shown by `pointscore --version`.

use std::env;

fn main() {
    built::write_built_file().expect("Failed to acquire build-time information");

    println!("cargo:rerun-if-env-changed=GIT_COMMIT_HASH");

    let host = env::var("HOST").unwrap_or_else(|_| "unknown".to_string());
    let commit = env::var("GIT_COMMIT_HASH").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=BUILT_HOST={}", host);
    println!("cargo:rustc-env=BUILT_GIT_COMMIT_HASH={}", commit);
    println!(
        "cargo:rustc-env=BUILT_TIME_UTC={}",
        chrono::Utc::now().to_rfc3339()
    );
}
