use std::env;
use std::fs;

use serde::Deserialize;

use crate::errors::UnrecoverableError;

const DEFAULT_CONFIG_PATH: &str = "pv_forecast.toml";

/// Process configuration, built once at startup and passed by reference
#[derive(Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub web_server: WebServer,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub cors: CorsConfig,
    pub victron: Option<VictronConfig>,
}

#[derive(Deserialize, Clone)]
pub struct WebServer {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,
}

#[derive(Deserialize, Clone)]
pub struct Logging {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Browser origins allowed to call the API, empty means any origin
#[derive(Deserialize, Clone, Default)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Victron VRM credentials and the optional installation override.
/// api_url points the adapter at a non production VRM instance.
#[derive(Deserialize, Clone)]
pub struct VictronConfig {
    pub username: String,
    pub password: String,
    pub site_id: Option<i64>,
    pub api_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            web_server: WebServer::default(),
            logging: Logging::default(),
            cors: CorsConfig::default(),
            victron: None,
        }
    }
}

impl Default for WebServer {
    fn default() -> Self {
        WebServer { bind_address: default_bind_address(), bind_port: default_bind_port() }
    }
}

impl Default for Logging {
    fn default() -> Self {
        Logging { level: default_log_level() }
    }
}

fn default_bind_address() -> String { "0.0.0.0".to_string() }
fn default_bind_port() -> u16 { 8000 }
fn default_log_level() -> String { "info".to_string() }

/// Returns the process configuration
///
/// Reads the settings file named by PV_FORECAST_CONFIG (falling back to
/// pv_forecast.toml, and to built in defaults when no file is present).
/// VICTRON_USER and VICTRON_PASS in the environment take precedence over any
/// credentials from the file.
pub fn config() -> Result<Config, UnrecoverableError> {
    let path = env::var("PV_FORECAST_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let mut config: Config = match fs::read_to_string(&path) {
        Ok(raw) => toml::from_str(&raw)?,
        Err(_) => Config::default(),
    };

    if let (Ok(username), Ok(password)) = (env::var("VICTRON_USER"), env::var("VICTRON_PASS")) {
        let site_id = config.victron.as_ref().and_then(|v| v.site_id);
        let api_url = config.victron.as_ref().and_then(|v| v.api_url.clone());
        config.victron = Some(VictronConfig { username, password, site_id, api_url });
    }

    Ok(config)
}
