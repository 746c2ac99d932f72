use std::process::Command;

fn main() {
    // Compilation timestamp for the startup banner
    let timestamp = Command::new("date")
        .args(["+%Y-%m-%d %H:%M:%S UTC"])
        .env("TZ", "UTC")
        .output()
        .ok()
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", timestamp);
}
