use std::process::Command;

fn main() {
    // Release tarballs have no .git; packagers can pass CORDLINK_GIT_SHA.
    let git_sha = std::env::var("CORDLINK_GIT_SHA")
        .ok()
        .filter(|sha| !sha.is_empty())
        .or_else(git_short_sha)
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=GIT_SHA={git_sha}");
    println!("cargo:rerun-if-env-changed=CORDLINK_GIT_SHA");
    println!("cargo:rerun-if-changed=.git/HEAD");
}

fn git_short_sha() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
