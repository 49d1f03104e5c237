//! Browser fetch tier for sites the plain HTTP client cannot serve.
//!
//! Uses chromiumoxide (CDP) with a handful of evasion tweaks so pages behind
//! bot protection render the same content a real visitor would see. At most
//! one browser runs per crawl; callers open the session explicitly, reuse it
//! for every fetch, and close it when the crawl step finishes.

mod config;

pub use config::BrowserEngineConfig;

use super::ScrapeError;

#[cfg(feature = "browser")]
use std::sync::Arc;
#[cfg(feature = "browser")]
use std::time::Duration;

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;
#[cfg(feature = "browser")]
use tokio::sync::Mutex;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

#[cfg(feature = "browser")]
impl From<chromiumoxide::error::CdpError> for ScrapeError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        ScrapeError::Browser(e.to_string())
    }
}

/// User agent reported to sites when fetching through the browser.
#[cfg(feature = "browser")]
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Evasion JavaScript injected into pages after navigation.
#[cfg(feature = "browser")]
const EVASION_SCRIPTS: &[&str] = &[
    // navigator.webdriver
    r#"
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined,
        configurable: true
    });
    "#,
    // window.chrome stub
    r#"
    window.chrome = {
        runtime: {},
        loadTimes: function() {},
        csi: function() {},
        app: {}
    };
    "#,
    // navigator.languages
    r#"
    Object.defineProperty(navigator, 'languages', {
        get: () => ['en-US', 'en'],
        configurable: true
    });
    "#,
];

/// Exclusive handle on a single headless browser.
///
/// `ensure_open` and `close` are both idempotent; `fetch_html` and
/// `fetch_image` require the session to already be open.
#[cfg(feature = "browser")]
pub struct BrowserSession {
    config: BrowserEngineConfig,
    browser: Option<Arc<Mutex<Browser>>>,
}

#[cfg(feature = "browser")]
impl BrowserSession {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        // Common install locations
        "/opt/google/chrome/google-chrome",
    ];

    /// Create a closed session.
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self {
            config,
            browser: None,
        }
    }

    /// Find a Chrome executable, checking well-known paths then PATH.
    fn find_chrome() -> Result<std::path::PathBuf, String> {
        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                return Ok(p.to_path_buf());
            }
        }

        for cmd in [
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(path) = which::which(cmd) {
                return Ok(path);
            }
        }

        Err("Chrome/Chromium not found. Install chromium or google-chrome.".to_string())
    }

    /// Launch the browser if it is not already running.
    ///
    /// Launch failures leave the session closed and are fatal to the caller's
    /// current operation.
    pub async fn ensure_open(&mut self) -> Result<(), ScrapeError> {
        if self.browser.is_some() {
            return Ok(());
        }

        let chrome_path = Self::find_chrome().map_err(ScrapeError::ResourceUnavailable)?;
        info!(
            "Launching browser at {} (headless={})",
            chrome_path.display(),
            self.config.headless
        );

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

        // with_head means NOT headless, confusingly
        if !self.config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = self.config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--start-maximized")
            .arg("--window-size=1920,1080");

        for arg in &self.config.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder.build().map_err(ScrapeError::ResourceUnavailable)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::ResourceUnavailable(e.to_string()))?;

        // Drive the CDP event loop until the browser goes away.
        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        self.browser = Some(Arc::new(Mutex::new(browser)));

        Ok(())
    }

    /// Whether the browser is currently running.
    pub fn is_live(&self) -> bool {
        self.browser.is_some()
    }

    /// Fetch a page through the browser and return its rendered HTML.
    ///
    /// `wait_selector` overrides the configured selector for this fetch.
    pub async fn fetch_html(
        &mut self,
        url: &str,
        wait_selector: Option<&str>,
    ) -> Result<String, ScrapeError> {
        let browser = self.browser.as_ref().ok_or_else(|| {
            ScrapeError::ResourceUnavailable("Browser session is not open".to_string())
        })?;

        let browser = browser.lock().await;
        let page = browser.new_page("about:blank").await?;

        // Set a realistic user agent before any navigation
        page.execute(SetUserAgentOverrideParams::new(
            BROWSER_USER_AGENT.to_string(),
        ))
        .await?;

        debug!("Navigating to {}", url);
        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| ScrapeError::Browser(format!("Invalid URL: {}", e)))?;
        page.execute(nav_params).await?;

        self.wait_until_ready(&page).await;

        // Evasion scripts need a real page context, so apply them after load
        self.apply_evasion(&page).await;

        // Give late-loading scripts a moment to render content
        tokio::time::sleep(Duration::from_millis(500)).await;

        let selector = wait_selector.or(self.config.wait_for_selector.as_deref());
        if let Some(selector) = selector {
            debug!("Waiting for selector: {}", selector);
            let timeout = Duration::from_secs(self.config.timeout);
            match tokio::time::timeout(timeout, page.find_element(selector)).await {
                Ok(Ok(_)) => debug!("Selector found"),
                Ok(Err(e)) => warn!("Selector not found: {}", e),
                Err(_) => warn!("Timeout waiting for selector"),
            }
        }

        let content = page.content().await?;

        // Close the page to prevent tab accumulation
        let _ = page.close().await;

        Ok(content)
    }

    /// Download an image using JavaScript `fetch` from within the browser
    /// session, so hotlink protection sees an ordinary in-page request.
    pub async fn fetch_image(&mut self, url: &str) -> Result<Vec<u8>, ScrapeError> {
        let browser = self.browser.as_ref().ok_or_else(|| {
            ScrapeError::ResourceUnavailable("Browser session is not open".to_string())
        })?;

        let browser = browser.lock().await;
        let page = browser.new_page("about:blank").await?;

        page.execute(SetUserAgentOverrideParams::new(
            BROWSER_USER_AGENT.to_string(),
        ))
        .await?;

        debug!("Fetching image {}", url);
        let fetch_script = format!(
            r#"
            (async () => {{
                try {{
                    const response = await fetch('{}', {{
                        method: 'GET',
                        credentials: 'include',
                        headers: {{ 'Accept': 'image/avif,image/webp,image/*,*/*' }}
                    }});

                    if (!response.ok) {{
                        return {{ error: `HTTP ${{response.status}}: ${{response.statusText}}` }};
                    }}

                    const blob = await response.blob();
                    const arrayBuffer = await blob.arrayBuffer();
                    const bytes = new Uint8Array(arrayBuffer);

                    let binary = '';
                    for (let i = 0; i < bytes.length; i++) {{
                        binary += String.fromCharCode(bytes[i]);
                    }}

                    return {{ size: bytes.length, data: btoa(binary) }};
                }} catch (e) {{
                    return {{ error: e.toString() }};
                }}
            }})()
            "#,
            url
        );

        let result: serde_json::Value = page
            .evaluate(fetch_script)
            .await?
            .into_value()
            .map_err(|e| ScrapeError::Browser(format!("Unreadable fetch result: {}", e)))?;

        let _ = page.close().await;

        if let Some(error) = result.get("error").and_then(|e| e.as_str()) {
            return Err(ScrapeError::Browser(format!(
                "In-page fetch failed: {}",
                error
            )));
        }

        let data_b64 = result.get("data").and_then(|d| d.as_str()).unwrap_or("");

        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(data_b64)
            .map_err(|e| ScrapeError::Browser(format!("Failed to decode image data: {}", e)))
    }

    /// Wait for the document to become interactive, bounded by the configured
    /// timeout.
    async fn wait_until_ready(&self, page: &Page) {
        let ready_script = r#"
            new Promise((resolve) => {
                if (document.readyState === 'complete' || document.readyState === 'interactive') {
                    resolve(document.readyState);
                } else {
                    document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
                    // Fallback timeout in case the event never fires
                    setTimeout(() => resolve('timeout'), 10000);
                }
            })
        "#;

        let ready_timeout = Duration::from_secs(self.config.timeout);
        match tokio::time::timeout(ready_timeout, page.evaluate(ready_script.to_string())).await {
            Ok(Ok(result)) => {
                let state: String = result
                    .into_value()
                    .unwrap_or_else(|_| "unknown".to_string());
                debug!("Page ready state: {}", state);
            }
            Ok(Err(e)) => {
                debug!("Could not check ready state: {}", e);
            }
            Err(_) => {
                warn!("Timeout waiting for page ready state");
            }
        }
    }

    /// Apply evasion scripts to a page, best-effort.
    async fn apply_evasion(&self, page: &Page) {
        for script in EVASION_SCRIPTS {
            if let Err(e) = page.evaluate(script.to_string()).await {
                // Can fail on non-HTML pages or during navigation; not critical
                debug!("Evasion script injection skipped: {}", e);
            }
        }
    }

    /// Shut the browser down. Safe to call when already closed.
    pub async fn close(&mut self) {
        if let Some(browser) = self.browser.take() {
            let mut browser = browser.lock().await;
            if let Err(e) = browser.close().await {
                debug!("Browser close failed: {}", e);
            }
        }
    }
}

// Stub for when the browser feature is disabled. Opening the session fails
// with the resource-unavailable error, which callers treat as fatal for the
// operation that needed it.
#[cfg(not(feature = "browser"))]
pub struct BrowserSession {
    #[allow(dead_code)]
    config: BrowserEngineConfig,
}

#[cfg(not(feature = "browser"))]
impl BrowserSession {
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self { config }
    }

    pub async fn ensure_open(&mut self) -> Result<(), ScrapeError> {
        Err(ScrapeError::ResourceUnavailable(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
                .to_string(),
        ))
    }

    pub fn is_live(&self) -> bool {
        false
    }

    pub async fn fetch_html(
        &mut self,
        _url: &str,
        _wait_selector: Option<&str>,
    ) -> Result<String, ScrapeError> {
        Err(ScrapeError::ResourceUnavailable(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
                .to_string(),
        ))
    }

    pub async fn fetch_image(&mut self, _url: &str) -> Result<Vec<u8>, ScrapeError> {
        Err(ScrapeError::ResourceUnavailable(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
                .to_string(),
        ))
    }

    pub async fn close(&mut self) {}
}
