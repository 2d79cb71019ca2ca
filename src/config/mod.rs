use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::calendar::DEFAULT_SPAN;
use crate::persistence::DEFAULT_NAMESPACE;

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "Daybook";
const APP_NAME: &str = "daybook";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            default_cfg.post_load(&self.paths)?;
            self.write_default_config(&default_cfg)?;
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load(&self.paths)?;
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
}

impl ConfigPaths {
    /// XDG locations, overridden by `DAYBOOK_CONFIG` / `DAYBOOK_DATA`.
    pub fn discover() -> Result<Self> {
        Self::resolve(None, None)
    }

    /// Explicit overrides win over the environment, which wins over XDG.
    /// `config` may name either a file or a directory.
    pub fn resolve(config: Option<PathBuf>, data: Option<PathBuf>) -> Result<Self> {
        let config = config.or_else(|| env::var_os("DAYBOOK_CONFIG").map(PathBuf::from));
        let data = data.or_else(|| env::var_os("DAYBOOK_DATA").map(PathBuf::from));

        let project_dirs = || {
            ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
                .context("resolving XDG project directories")
        };

        let (config_dir, config_file) = match config {
            Some(path) if path.is_dir() || path.extension().is_none() => {
                (path.clone(), path.join("config.toml"))
            }
            Some(path) => {
                let dir = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                (dir, path)
            }
            None => {
                let dir = project_dirs()?.config_dir().to_path_buf();
                let file = dir.join("config.toml");
                (dir, file)
            }
        };

        let data_dir = match data {
            Some(path) => path,
            None => project_dirs()?.data_dir().to_path_buf(),
        };
        let database_path = data_dir.join("daybook.db");

        Ok(Self {
            config_dir,
            config_file,
            data_dir,
            database_path,
        })
    }

    pub fn under(root: &Path) -> Self {
        Self {
            config_dir: root.join("config"),
            config_file: root.join("config/config.toml"),
            data_dir: root.join("data"),
            database_path: root.join("data/daybook.db"),
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.data_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tick_rate_ms: u64,
    pub calendar: CalendarOptions,
    pub persistence: PersistenceConfig,
    pub storage: StorageOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 50,
            calendar: CalendarOptions::default(),
            persistence: PersistenceConfig::default(),
            storage: StorageOptions::default(),
        }
    }
}

impl AppConfig {
    fn post_load(&mut self, paths: &ConfigPaths) -> Result<()> {
        self.storage
            .resolve(paths)
            .context("resolving storage paths")?;
        self.calendar.sanitize();
        self.persistence.sanitize();
        if self.tick_rate_ms == 0 {
            tracing::warn!("tick_rate_ms must be positive, falling back to 50");
            self.tick_rate_ms = 50;
        }
        Ok(())
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarOptions {
    /// Days materialized on each side of the seed at startup.
    pub initial_span: usize,
    /// Days added per expansion.
    pub batch_size: usize,
    /// Rows beyond the viewport edge at which a boundary day triggers expansion.
    pub proximity_margin: f64,
    /// Terminal rows per day.
    pub day_height: u16,
}

impl Default for CalendarOptions {
    fn default() -> Self {
        Self {
            initial_span: DEFAULT_SPAN,
            batch_size: DEFAULT_SPAN,
            proximity_margin: 6.0,
            day_height: 2,
        }
    }
}

impl CalendarOptions {
    fn sanitize(&mut self) {
        let defaults = Self::default();
        if self.batch_size == 0 {
            tracing::warn!("calendar.batch_size must be positive, using default");
            self.batch_size = defaults.batch_size;
        }
        if self.day_height == 0 {
            tracing::warn!("calendar.day_height must be positive, using default");
            self.day_height = defaults.day_height;
        }
        if !self.proximity_margin.is_finite() || self.proximity_margin < 0.0 {
            tracing::warn!(
                margin = self.proximity_margin,
                "calendar.proximity_margin must be non-negative, using default"
            );
            self.proximity_margin = defaults.proximity_margin;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub enabled: bool,
    pub namespace: String,
    pub debounce_ms: u64,
    /// Delay before the saved scroll offset is re-applied, giving the first
    /// layout pass time to settle.
    pub restore_delay_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: DEFAULT_NAMESPACE.to_string(),
            debounce_ms: 100,
            restore_delay_ms: 100,
        }
    }
}

impl PersistenceConfig {
    fn sanitize(&mut self) {
        if self.namespace.trim().is_empty() {
            tracing::warn!("persistence.namespace is empty, using default");
            self.namespace = DEFAULT_NAMESPACE.to_string();
        }
    }

    pub fn restore_delay(&self) -> Duration {
        Duration::from_millis(self.restore_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    #[serde(skip)]
    pub database_path: PathBuf,
    pub wal_autocheckpoint: u32,
    /// Insert a handful of example entries when the database is created.
    pub seed_samples: bool,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            database_path: PathBuf::new(),
            wal_autocheckpoint: 1000,
            seed_samples: true,
        }
    }
}

impl StorageOptions {
    fn resolve(&mut self, paths: &ConfigPaths) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            self.database_path = paths.database_path.clone();
        }
        Ok(())
    }
}
