//! Configuration loading and management

use anyhow::{Context, Result, bail};
use bookshelf_db::{Backend, ConnectOptions, ConnectionStrategy};
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

/// Which relational store to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DbDriver {
    #[default]
    Mysql,
    Sqlite,
}

/// Connection lifecycle, see [`ConnectionStrategy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    #[default]
    Pooled,
    Shared,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub driver: DbDriver,
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default = "default_db_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_db_name")]
    pub name: String,
    /// SQLite file, used when `driver = "sqlite"`
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Full connection URL; takes precedence over every other connection field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub mode: ConnectionMode,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    #[serde(default = "default_statement_timeout_secs")]
    pub statement_timeout_secs: u64,
    #[serde(default = "default_auto_migrate")]
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DbDriver::default(),
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_user(),
            password: String::new(),
            name: default_db_name(),
            path: default_db_path(),
            url: None,
            mode: ConnectionMode::default(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            statement_timeout_secs: default_statement_timeout_secs(),
            auto_migrate: default_auto_migrate(),
        }
    }
}

impl DatabaseConfig {
    /// Build the options used to open the store
    pub fn connect_options(&self) -> Result<ConnectOptions> {
        let backend = match (&self.url, self.driver) {
            (Some(url), _) => Backend::Url(url.clone()),
            (None, DbDriver::Mysql) => Backend::MySql {
                host: self.host.clone(),
                port: self.port,
                user: self.user.clone(),
                password: self.password.clone(),
                database: self.name.clone(),
            },
            (None, DbDriver::Sqlite) => Backend::Sqlite {
                path: PathBuf::from(&self.path),
            },
        };

        let strategy = match self.mode {
            ConnectionMode::Shared => ConnectionStrategy::Shared,
            ConnectionMode::Pooled => {
                if self.max_connections == 0 {
                    bail!("database.max_connections must be at least 1");
                }
                ConnectionStrategy::Pooled {
                    max_connections: self.max_connections,
                }
            }
        };

        let mut options = ConnectOptions::new(backend).with_strategy(strategy);
        options.acquire_timeout = Duration::from_secs(self.acquire_timeout_secs);
        options.statement_timeout = Duration::from_secs(self.statement_timeout_secs);
        options.auto_migrate = self.auto_migrate;
        Ok(options)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Seed import configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_seed_dir")]
    pub dir: PathBuf,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            dir: default_seed_dir(),
        }
    }
}

/// Connection settings taken from the command line or the environment
#[derive(Args, Debug, Clone, Default)]
pub struct DatabaseOverrides {
    /// Database driver
    #[arg(long = "db-driver", env = "DB_DRIVER", global = true, value_enum)]
    pub driver: Option<DbDriver>,

    /// Database host
    #[arg(long = "db-host", env = "DB_HOST", global = true)]
    pub host: Option<String>,

    /// Database port
    #[arg(long = "db-port", env = "DB_PORT", global = true)]
    pub port: Option<u16>,

    /// Database user
    #[arg(long = "db-user", env = "DB_USER", global = true)]
    pub user: Option<String>,

    /// Database password
    #[arg(long = "db-password", env = "DB_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Database name
    #[arg(long = "db-name", env = "DB_NAME", global = true)]
    pub name: Option<String>,

    /// SQLite database file
    #[arg(long = "db-path", env = "DB_PATH", global = true)]
    pub path: Option<String>,

    /// Full connection URL
    #[arg(long = "database-url", env = "DATABASE_URL", global = true, hide_env_values = true)]
    pub url: Option<String>,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    3306
}

fn default_db_user() -> String {
    "root".to_string()
}

fn default_db_name() -> String {
    "bookshelf".to_string()
}

fn default_db_path() -> String {
    "./data/bookshelf.db".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

fn default_statement_timeout_secs() -> u64 {
    10
}

fn default_auto_migrate() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_seed_dir() -> PathBuf {
    PathBuf::from("./seed")
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &str) -> Result<Self> {
        let config_path = Path::new(path);

        // Check if config file exists
        if !config_path.exists() {
            info!("Config file not found at {}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        info!("Loaded configuration from {}", path);
        Ok(config)
    }

    /// Replace file values with any connection setting given on the command line or in the environment
    pub fn apply_overrides(&mut self, overrides: &DatabaseOverrides) {
        let db = &mut self.database;
        if let Some(driver) = overrides.driver {
            db.driver = driver;
        }
        if let Some(host) = &overrides.host {
            db.host = host.clone();
        }
        if let Some(port) = overrides.port {
            db.port = port;
        }
        if let Some(user) = &overrides.user {
            db.user = user.clone();
        }
        if let Some(password) = &overrides.password {
            db.password = password.clone();
        }
        if let Some(name) = &overrides.name {
            db.name = name.clone();
        }
        if let Some(path) = &overrides.path {
            db.path = path.clone();
        }
        if let Some(url) = &overrides.url {
            db.url = Some(url.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 8082);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.database.driver, DbDriver::Mysql);
        assert_eq!(config.database.port, 3306);
        assert_eq!(config.database.mode, ConnectionMode::Pooled);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.import.dir, PathBuf::from("./seed"));
    }

    #[test]
    fn test_parse_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [server]
            port = 9000

            [database]
            driver = "sqlite"
            path = "/tmp/books.db"
            mode = "shared"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.database.driver, DbDriver::Sqlite);
        assert_eq!(config.database.mode, ConnectionMode::Shared);
        assert_eq!(config.database.user, "root");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[database]\nmode = \"sometimes\"\n").unwrap();

        assert!(Config::load(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut config = Config::default();
        config.database.host = "from-file".to_string();
        config.database.user = "file-user".to_string();

        config.apply_overrides(&DatabaseOverrides {
            host: Some("db.internal".to_string()),
            port: Some(3307),
            password: Some("secret".to_string()),
            ..Default::default()
        });

        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 3307);
        assert_eq!(config.database.password, "secret");
        assert_eq!(config.database.user, "file-user");
    }

    #[test]
    fn test_connect_options_for_mysql() {
        let mut config = DatabaseConfig {
            password: "pw".to_string(),
            ..Default::default()
        };

        let options = config.connect_options().unwrap();
        assert_eq!(
            options.backend.url().unwrap(),
            "mysql://root:pw@localhost:3306/bookshelf"
        );
        assert_eq!(
            options.strategy,
            ConnectionStrategy::Pooled {
                max_connections: 10
            }
        );
        assert_eq!(options.statement_timeout, Duration::from_secs(10));

        config.url = Some("sqlite::memory:".to_string());
        config.mode = ConnectionMode::Shared;
        let options = config.connect_options().unwrap();
        assert_eq!(options.backend, Backend::Url("sqlite::memory:".to_string()));
        assert_eq!(options.strategy, ConnectionStrategy::Shared);
    }

    #[test]
    fn test_connect_options_for_sqlite() {
        let config = DatabaseConfig {
            driver: DbDriver::Sqlite,
            path: "/var/lib/bookshelf.db".to_string(),
            ..Default::default()
        };

        let options = config.connect_options().unwrap();
        assert_eq!(
            options.backend,
            Backend::Sqlite {
                path: PathBuf::from("/var/lib/bookshelf.db")
            }
        );
    }

    #[test]
    fn test_empty_pool_is_rejected() {
        let config = DatabaseConfig {
            max_connections: 0,
            ..Default::default()
        };
        assert!(config.connect_options().is_err());
    }
}
