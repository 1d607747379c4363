//! # Browser Launch
//!
//! Spawns a local Chromium-based browser pointed at the host page. The
//! browser is an external collaborator: this module only finds a binary and
//! starts the process with flags derived from configuration — it does not
//! manage the process beyond holding on to the child handle.

use crate::config::AppConfig;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tracing::info;

/// Chromium-flavored binaries probed on PATH, in preference order.
const BROWSER_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
    "brave-browser",
    "microsoft-edge",
];

/// Launch the browser against the configured host page.
///
/// In kiosk mode the URL is opened as a normal tab (the `--kiosk` flag
/// already removes all chrome); otherwise `--app=` gives a bare window
/// without browser UI, which is what a desktop-like shell wants.
pub fn launch(config: &AppConfig) -> Result<Child> {
    let url = format!("http://{}:{}/", config.server.host, config.server.port);
    let binary = find_browser()
        .ok_or_else(|| anyhow::anyhow!("no Chromium-based browser found on PATH"))?;

    let mut command = Command::new(&binary);
    command.args(config.browser.launch_args());
    if config.browser.kiosk_mode {
        command.arg(&url);
    } else {
        command.arg(format!("--app={}", url));
    }

    let child = command
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    info!("launched browser {} (pid {})", binary.display(), child.id());
    Ok(child)
}

/// Probe PATH for the first known Chromium-flavored binary.
fn find_browser() -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;

    for candidate in BROWSER_CANDIDATES {
        for dir in std::env::split_paths(&path_var) {
            let full = dir.join(candidate);
            if is_executable(&full) {
                return Some(full);
            }
        }
    }

    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
