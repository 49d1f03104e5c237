//! Configuration management for novelacquire.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::repository::DbContext;
use crate::scrapers::browser::BrowserEngineConfig;

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "novelacquire.db";

/// Default novels subdirectory name.
const NOVELS_SUBDIR: &str = "novels";

/// Default grace window before a novel folder is eligible for size-based
/// cleanup, in hours.
pub const DEFAULT_RETENTION_GRACE_HOURS: i64 = 24;

/// Resolved runtime settings, shared by the CLI commands and the server.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory holding the catalog database.
    pub data_dir: PathBuf,
    /// Catalog database filename inside data_dir.
    pub database_filename: String,
    /// Explicit database URL; when set it wins over
    /// data_dir/database_filename. Comes from DATABASE_URL or config.
    pub database_url: Option<String>,
    /// Directory for storing novel output folders.
    pub output_dir: PathBuf,
    /// User agent for HTTP requests.
    pub user_agent: String,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Delay between requests in milliseconds.
    pub request_delay_ms: u64,
    /// Total output size budget in bytes. <= 0 disables size-based cleanup.
    pub disk_size_limit: i64,
    /// Extra headroom subtracted from the limit when trimming. 0 trims to
    /// exactly the limit.
    pub disk_size_margin: i64,
    /// Hours a novel must be untouched before size-based cleanup may delete
    /// its folder.
    pub retention_grace_hours: i64,
    /// Seconds between scheduled cleanup sweeps.
    pub sweep_interval_secs: u64,
    /// Browser engine configuration for the browser-backed tier.
    pub browser: BrowserEngineConfig,
}

impl Default for Settings {
    fn default() -> Self {
        // ~/Documents/novelacquire, or the home or current directory when
        // the platform has no Documents folder.
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("novelacquire");

        Self {
            output_dir: data_dir.join(NOVELS_SUBDIR),
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_url: None,
            user_agent: "novelacquire/0.3 (personal archiving)".to_string(),
            request_timeout: 30,
            request_delay_ms: 500,
            disk_size_limit: 0,
            disk_size_margin: 0,
            retention_grace_hours: DEFAULT_RETENTION_GRACE_HOURS,
            sweep_interval_secs: 3600,
            browser: BrowserEngineConfig::default(),
        }
    }
}

impl Settings {
    /// Database URL, built from data_dir/database_filename unless an
    /// explicit URL was configured.
    pub fn database_url(&self) -> String {
        match self.database_url {
            Some(ref url) => url.clone(),
            None => format!(
                "sqlite:{}",
                self.data_dir.join(&self.database_filename).display()
            ),
        }
    }

    /// Path to the database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Create the data and output directories if they are missing.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        let mkdir = |label: &str, dir: &Path| {
            fs::create_dir_all(dir).map_err(|e| {
                std::io::Error::new(
                    e.kind(),
                    format!("Failed to create {} directory '{}': {}", label, dir.display(), e),
                )
            })
        };
        mkdir("data", &self.data_dir)?;
        mkdir("output", &self.output_dir)?;
        Ok(())
    }

    /// Create a database context using the configured database URL or path.
    pub fn create_db_context(&self) -> DbContext {
        DbContext::from_url(&self.database_url(), self.output_dir.clone())
    }
}

/// On-disk config file shape. Every field is optional; missing ones
/// keep their `Settings` defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "target")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Novel output directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    /// User agent for crawl requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// HTTP request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// Politeness delay between requests, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_delay_ms: Option<u64>,
    /// Total output size budget in bytes. <= 0 disables size-based cleanup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_size_limit: Option<i64>,
    /// Extra headroom subtracted from the limit when trimming.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_size_margin: Option<i64>,
    /// Grace window in hours for size-based cleanup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_grace_hours: Option<i64>,
    /// Seconds between scheduled cleanup sweeps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep_interval_secs: Option<u64>,
    /// Browser engine configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<BrowserEngineConfig>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration by checking the standard candidate locations.
    pub async fn load() -> Self {
        if let Some(path) = discover_config_path() {
            match Self::load_from_path(&path).await {
                Ok(config) => return config,
                Err(e) => tracing::warn!("Ignoring config {}: {}", path.display(), e),
            }
        }
        Self::default()
    }

    /// Load a config file, picking the format from the extension.
    /// TOML, YAML, and JSON are accepted; anything else parses as JSON.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Could not read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Invalid TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Invalid YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Invalid JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory that relative paths in this config resolve against:
    /// the config file's own directory, when known.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Expand `~` and resolve relative paths against `base_dir`.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Overlay the file's values onto `settings`. Paths are resolved
    /// against `base_dir`.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
            settings.output_dir = settings.data_dir.join(NOVELS_SUBDIR);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref output_dir) = self.output_dir {
            settings.output_dir = self.resolve_path(output_dir, base_dir);
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = user_agent.clone();
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(delay) = self.request_delay_ms {
            settings.request_delay_ms = delay;
        }
        if let Some(limit) = self.disk_size_limit {
            settings.disk_size_limit = limit;
        }
        if let Some(margin) = self.disk_size_margin {
            settings.disk_size_margin = margin;
        }
        if let Some(grace) = self.retention_grace_hours {
            settings.retention_grace_hours = grace;
        }
        if let Some(interval) = self.sweep_interval_secs {
            settings.sweep_interval_secs = interval;
        }
        if let Some(ref browser) = self.browser {
            settings.browser = browser.clone();
        }
    }
}

/// Knobs the CLI's global flags feed into settings loading.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path; skips discovery.
    pub config_path: Option<PathBuf>,
    /// Resolve relative paths against the working directory instead of
    /// the config file's directory.
    pub use_cwd: bool,
    /// Data directory or database file (--target flag).
    /// Can be a directory containing novelacquire.db or a .db file directly.
    pub target: Option<PathBuf>,
}

/// Where a `--target` argument points: the data directory plus the
/// database filename inside it.
#[derive(Debug, Clone)]
struct ResolvedTarget {
    data_dir: PathBuf,
    database_filename: String,
}

impl ResolvedTarget {
    /// A `.db`/`.sqlite` file targets that file, with its parent as the
    /// data dir; a directory gets the default database filename inside.
    fn from_path(path: &Path) -> Self {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(path)
        };

        let is_db_file = path
            .extension()
            .is_some_and(|ext| ext == "db" || ext == "sqlite" || ext == "sqlite3")
            || (path.exists() && path.is_file());

        if is_db_file {
            let database_filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(DEFAULT_DATABASE_FILENAME)
                .to_string();
            let data_dir = path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."));
            Self {
                data_dir,
                database_filename,
            }
        } else {
            Self {
                data_dir: path,
                database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            }
        }
    }
}

/// First existing `novelacquire.*` or `config.*` file in `dir`, trying
/// toml, yaml, yml, json in that order.
fn config_in_dir(dir: &Path) -> Option<PathBuf> {
    for basename in ["novelacquire", "config"] {
        for ext in ["toml", "yaml", "yml", "json"] {
            let path = dir.join(format!("{}.{}", basename, ext));
            if path.exists() {
                return Some(path);
            }
        }
    }
    None
}

/// Candidate config locations, checked in order: the current directory,
/// then the platform config directory.
fn discover_config_path() -> Option<PathBuf> {
    if let Some(path) = config_in_dir(Path::new(".")) {
        return Some(path);
    }
    dirs::config_dir().and_then(|d| config_in_dir(&d.join("novelacquire")))
}

/// Config file sitting next to the database, if any.
fn find_config_next_to_db(data_dir: &Path) -> Option<PathBuf> {
    config_in_dir(data_dir)
}

/// Build the effective settings from defaults, config file, target
/// override, and environment, in that order. The raw `Config` comes back
/// too for callers that care where values came from.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let resolved_target = options.target.as_ref().map(|t| ResolvedTarget::from_path(t));

    // Priority: explicit --config, config next to the target, discovery.
    let config = if let Some(ref config_path) = options.config_path {
        Config::load_from_path(config_path)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Ignoring config {}: {}", config_path.display(), e);
                Config::default()
            })
    } else if let Some(ref resolved) = resolved_target {
        if let Some(config_path) = find_config_next_to_db(&resolved.data_dir) {
            tracing::debug!("Found config next to target: {}", config_path.display());
            Config::load_from_path(&config_path)
                .await
                .unwrap_or_else(|_| Config::default())
        } else {
            Config::load().await
        }
    } else {
        Config::load().await
    };

    let mut settings = Settings::default();

    // Relative paths resolve against the config file unless --cwd asked
    // for the working directory.
    let base_dir = if options.use_cwd {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    } else {
        config
            .base_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    };

    config.apply_to_settings(&mut settings, &base_dir);

    // --target wins over the config file for data_dir and output_dir.
    if let Some(resolved) = resolved_target {
        settings.data_dir = resolved.data_dir;
        settings.output_dir = settings.data_dir.join(NOVELS_SUBDIR);
        settings.database_filename = resolved.database_filename;
    }

    // Env vars win over everything; DATABASE_URL is checked last.
    if let Some(output_dir) = std::env::var("NOVELACQUIRE_OUTPUT_DIR")
        .ok()
        .filter(|s| !s.is_empty())
    {
        settings.output_dir = PathBuf::from(shellexpand::tilde(&output_dir).as_ref());
    }

    if let Some(limit) = std::env::var("NOVELACQUIRE_DISK_LIMIT")
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
    {
        settings.disk_size_limit = limit;
    }

    if let Some(database_url) = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()) {
        tracing::debug!("Using DATABASE_URL from environment");
        settings.database_url = Some(database_url);
    }

    (settings, config)
}
