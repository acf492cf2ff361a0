use std::process::Command;

fn git_short_sha() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!sha.is_empty()).then_some(sha)
}

fn main() {
    let base = env!("CARGO_PKG_VERSION");

    let nightly = matches!(
        std::env::var("SOLAR_SCRAPER_NIGHTLY").as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE")
    );

    // CI builds without a checkout pass the sha explicitly
    let sha = git_short_sha().or_else(|| std::env::var("GIT_SHA").ok().filter(|s| !s.is_empty()));

    let version = match (nightly, sha) {
        (true, Some(sha)) => format!("{base}-nightly+{sha}"),
        (true, None) => format!("{base}-nightly"),
        (false, _) => base.to_string(),
    };

    println!("cargo:rustc-env=APP_VERSION={version}");
    println!("cargo:rerun-if-env-changed=SOLAR_SCRAPER_NIGHTLY");
    println!("cargo:rerun-if-env-changed=GIT_SHA");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
