//! # Configuration Management
//!
//! Loads and manages application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_SERVER_HOST, APP_SERVER_PORT, etc.)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)
//!
//! The configuration is a read-only input to the channel components: the view,
//! playback, and recording sessions only ever consult the `debug` flag and the
//! page/server settings, they never write back.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
///
/// Broken into logical groups (server, page, browser, logging) so each part of
/// the application only needs to reason about its own section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub page: PageConfig,
    pub browser: BrowserConfig,
    pub logging: LoggingConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: only accept connections from localhost; the shell
///   is meant to drive a browser on the same machine
/// - `port = 8080`: default development port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Host page settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    /// Title shown on the browser tab
    pub title: String,
}

/// Browser launch configuration.
///
/// ## Fields:
/// - `auto_launch`: spawn a local Chromium/Chrome pointed at the host page
///   once the server is up
/// - `kiosk_mode`: fullscreen without any browser UI
/// - `orientation`: "landscape" or "portrait"; forcing portrait may require
///   additional system setup and is passed to the browser as a hint only
/// - `window_width`/`window_height`: explicit window size; both must be set
///   for the flag to be emitted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub auto_launch: bool,
    pub kiosk_mode: bool,
    pub orientation: String,
    pub window_width: Option<u32>,
    pub window_height: Option<u32>,
}

/// Logging configuration.
///
/// ## Fields:
/// - `debug`: gates the verbose per-event channel logging (connects,
///   disconnects, pushes) — nothing else
/// - `log_level`: default tracing filter when RUST_LOG is not set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub debug: bool,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            page: PageConfig {
                title: "Kioskview".to_string(),
            },
            browser: BrowserConfig {
                auto_launch: true,
                kiosk_mode: false,
                orientation: "landscape".to_string(),
                window_width: None,
                window_height: None,
            },
            logging: LoggingConfig {
                debug: false,
                log_level: "warn".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle the bare HOST and PORT variables used by deployment platforms
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER_HOST=0.0.0.0`: override server host
    /// - `APP_SERVER_PORT=3000`: override server port
    /// - `APP_LOGGING_DEBUG=true`: enable verbose channel logging
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        // Deployment platforms set these without the APP_ prefix
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0 (port 0 is reserved)
    /// - Orientation is one of the two values the browser flags understand
    /// - Window size, when given, has both dimensions non-zero
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.browser.orientation != "landscape" && self.browser.orientation != "portrait" {
            return Err(anyhow::anyhow!(
                "Browser orientation must be \"landscape\" or \"portrait\", got \"{}\"",
                self.browser.orientation
            ));
        }

        match (self.browser.window_width, self.browser.window_height) {
            (Some(0), _) | (_, Some(0)) => {
                return Err(anyhow::anyhow!("Browser window dimensions cannot be 0"));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(anyhow::anyhow!(
                    "Browser window size requires both window_width and window_height"
                ));
            }
            _ => {}
        }

        Ok(())
    }

    /// Update configuration from a JSON string (used for runtime config updates).
    ///
    /// Only the fields present in the JSON are touched, so a client can send
    /// just `{"page": {"title": "Status Board"}}` to rename the tab. The
    /// updated configuration is re-validated before it is accepted.
    pub fn update_from_json(&mut self, json_str: &str) -> Result<()> {
        let partial: serde_json::Value = serde_json::from_str(json_str)?;

        if let Some(server) = partial.get("server") {
            if let Some(host) = server.get("host").and_then(|v| v.as_str()) {
                self.server.host = host.to_string();
            }
            if let Some(port) = server.get("port").and_then(|v| v.as_u64()) {
                self.server.port = port as u16;
            }
        }

        if let Some(page) = partial.get("page") {
            if let Some(title) = page.get("title").and_then(|v| v.as_str()) {
                self.page.title = title.to_string();
            }
        }

        if let Some(browser) = partial.get("browser") {
            if let Some(auto_launch) = browser.get("auto_launch").and_then(|v| v.as_bool()) {
                self.browser.auto_launch = auto_launch;
            }
            if let Some(kiosk) = browser.get("kiosk_mode").and_then(|v| v.as_bool()) {
                self.browser.kiosk_mode = kiosk;
            }
            if let Some(orientation) = browser.get("orientation").and_then(|v| v.as_str()) {
                self.browser.orientation = orientation.to_string();
            }
            if let Some(width) = browser.get("window_width").and_then(|v| v.as_u64()) {
                self.browser.window_width = Some(width as u32);
            }
            if let Some(height) = browser.get("window_height").and_then(|v| v.as_u64()) {
                self.browser.window_height = Some(height as u32);
            }
        }

        if let Some(logging) = partial.get("logging") {
            if let Some(debug) = logging.get("debug").and_then(|v| v.as_bool()) {
                self.logging.debug = debug;
            }
            if let Some(level) = logging.get("log_level").and_then(|v| v.as_str()) {
                self.logging.log_level = level.to_string();
            }
        }

        self.validate()?;
        Ok(())
    }
}

impl BrowserConfig {
    /// Build the launch argument list for the browser process.
    ///
    /// The baseline flags suppress first-run dialogs and the autoplay gesture
    /// requirement (audio playback must work without a user click); the rest
    /// are derived from this configuration.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-first-run".to_string(),
            "--start-maximized".to_string(),
            "--disable-infobars".to_string(),
            "--no-default-browser-check".to_string(),
            "--autoplay-policy=no-user-gesture-required".to_string(),
        ];

        if self.kiosk_mode {
            args.push("--kiosk".to_string());
        }

        if self.orientation == "portrait" {
            args.push("--force-device-scale-factor=1".to_string());
            args.push("--force-device-orientation=portrait".to_string());
        }

        if let (Some(width), Some(height)) = (self.window_width, self.window_height) {
            args.push(format!("--window-size={},{}", width, height));
        }

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The default configuration must be valid and carry expected values.
    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert!(!config.logging.debug);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.browser.orientation = "upside-down".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.browser.window_width = Some(800);
        // Missing height
        assert!(config.validate().is_err());
        config.browser.window_height = Some(600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_update() {
        let mut config = AppConfig::default();
        let json = r#"{"page": {"title": "Status Board"}, "logging": {"debug": true}}"#;
        assert!(config.update_from_json(json).is_ok());
        assert_eq!(config.page.title, "Status Board");
        assert!(config.logging.debug);
        // Untouched fields keep their values
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_browser_launch_args() {
        let mut config = AppConfig::default();
        config.browser.kiosk_mode = true;
        config.browser.window_width = Some(1280);
        config.browser.window_height = Some(720);

        let args = config.browser.launch_args();
        assert!(args.contains(&"--kiosk".to_string()));
        assert!(args.contains(&"--window-size=1280,720".to_string()));
        assert!(args.contains(&"--autoplay-policy=no-user-gesture-required".to_string()));
    }
}
