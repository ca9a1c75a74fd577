use serde::{Deserialize, Serialize};

use crate::domain::models::{EngineSettings, MasterConfig, SlaveConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(rename = "type", default = "default_database_type")]
    pub kind: String,
    #[serde(default = "default_database_path")]
    pub path: String,
}

fn default_database_type() -> String {
    "sqlite".to_string()
}
fn default_database_path() -> String {
    "data/copier.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { kind: default_database_type(), path: default_database_path() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}
fn default_api_port() -> u16 {
    8080
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { host: default_api_host(), port: default_api_port() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_log_dir")]
    pub directory: String,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}
fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            enabled: false,
            directory: default_log_dir(),
        }
    }
}

/// Top-level configuration (§6): `master`, `slaves`, `settings`, `database`, `api`, `logging`,
/// loaded from YAML via the `config` crate's builder then overlaid with five environment
/// variables (`CONFIG_PATH`, `LOG_LEVEL`, `DATABASE_PATH`, `MASTER_HOST`, `MASTER_PORT`),
/// mirroring the original's `_apply_env_overrides`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub master: MasterConfig,
    #[serde(default)]
    pub slaves: Vec<SlaveConfig>,
    #[serde(default)]
    pub settings: EngineSettings,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// Loads `AppConfig` the way the teacher's `config.rs` does: a `config::Config` builder layering
/// a YAML file (path from `$CONFIG_PATH`, defaulting to `config/config.yaml`) with the five
/// environment overrides applied by hand afterward, since they don't follow the crate's generic
/// `APP__section__field` convention that the teacher otherwise relies on.
pub fn load() -> anyhow::Result<AppConfig> {
    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let builder = config::Config::builder()
        .add_source(config::File::with_name(&config_path).format(config::FileFormat::Yaml).required(false));

    let raw = builder.build()?;
    let mut app_config: AppConfig = raw.try_deserialize()?;

    apply_env_overrides(&mut app_config);
    Ok(app_config)
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(path) = std::env::var("DATABASE_PATH") {
        config.database.path = path;
    }
    if let Ok(host) = std::env::var("MASTER_HOST") {
        config.master.host = host;
    }
    if let Ok(port) = std::env::var("MASTER_PORT") {
        if let Ok(port) = port.parse() {
            config.master.port = port;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_config_defaults_to_sqlite_under_data() {
        let config = DatabaseConfig::default();
        assert_eq!(config.kind, "sqlite");
        assert_eq!(config.path, "data/copier.db");
    }

    #[test]
    fn api_config_defaults_bind_all_interfaces_on_8080() {
        let config = ApiConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
    }
}
