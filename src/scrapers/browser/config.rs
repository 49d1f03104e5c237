//! Browser engine configuration types.

use serde::{Deserialize, Serialize};

/// Browser engine configuration.
///
/// Available even when the `browser` feature is disabled so configuration
/// files parse the same way in every build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserEngineConfig {
    /// Run in headless mode (default: true).
    /// Set to false for debugging or if headless detection is an issue.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default)]
    pub proxy: Option<String>,

    /// Page load timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Wait for this CSS selector before considering a page loaded, unless
    /// the caller asks for a more specific one.
    #[serde(default)]
    pub wait_for_selector: Option<String>,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            proxy: None,
            timeout: default_timeout(),
            wait_for_selector: None,
            chrome_args: Vec::new(),
        }
    }
}

fn default_headless() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}
