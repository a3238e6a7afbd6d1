use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, error};

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP API port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Collaboration socket port
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Base URL of the document storage API used by sync clients
    pub persistence_url: Option<String>,

    /// Idle time before a client persists its edits
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full API server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the full collaboration socket address
    pub fn ws_address(&self) -> String {
        format!("{}:{}", self.host, self.ws_port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "prod" || self.environment.to_lowercase() == "production"
    }

    /// Configured CORS origins, empty when any origin is allowed
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ws_port: default_ws_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            cors_origins: None,
            service_name: default_service_name(),
            persistence_url: None,
            save_debounce_ms: default_save_debounce_ms(),
        }
    }
}

/// Install the process-wide configuration. Later calls are ignored.
pub fn init_config(config: Config) -> &'static Config {
    CONFIG.get_or_init(|| config)
}

#[derive(Debug)]
pub enum ConfigError {
    EnvError(envy::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EnvError(e) => write!(f, "Environment variable error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_ws_port() -> u16 {
    1234
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "wiki-collab".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_save_debounce_ms() -> u64 {
    2000
}
