use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{PailflowError, Result};

pub const DEFAULT_PORT: u16 = 8088;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_BOT_CALL_RATE_PER_MINUTE: f64 = 0.15;

/// Top-level config (pailflow.toml + PAILFLOW_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PailflowConfig {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub placement: PlacementConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub encryption: EncryptionConfig,
}

impl Default for PailflowConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            placement: PlacementConfig::default(),
            providers: ProvidersConfig::default(),
            email: EmailConfig::default(),
            database: DatabaseConfig::default(),
            encryption: EncryptionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            auth: AuthConfig::default(),
        }
    }
}

/// Bearer auth for `pailflow-gateway`: either a static local token, or an
/// external key-verification service URL that returns the caller's
/// `unkey_key_id` (spec.md §6 "Authentication").
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    pub token: Option<String>,
    pub verify_url: Option<String>,
}

/// Where bot sessions are placed — fallback order Function -> VM -> InProcess
/// (spec.md §4.4, grounded on the original's Modal/Fly fallback).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlacementConfig {
    pub function: Option<FunctionPlacementConfig>,
    pub vm: Option<VmPlacementConfig>,
    #[serde(default = "default_bot_call_rate_per_minute")]
    pub bot_call_rate_per_minute: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionPlacementConfig {
    pub app_name: String,
    pub function_name: String,
    pub sdk_endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmPlacementConfig {
    pub api_host: String,
    pub app_name: String,
    pub api_key: String,
}

/// Opaque provider credentials — no vendor SDK wiring (out of scope per spec.md §1).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub stt_api_key: Option<String>,
    pub tts_api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EmailConfig {
    pub provider_key: Option<String>,
    pub sending_domain: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Field-level encryption secret. Never read from the TOML file — always
/// pulled straight from the process environment, mirroring the original's
/// `os.getenv("ENCRYPTION_KEY")`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EncryptionConfig {
    #[serde(skip)]
    pub key: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_bot_call_rate_per_minute() -> f64 {
    DEFAULT_BOT_CALL_RATE_PER_MINUTE
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.pailflow/pailflow.db", home)
}

impl PailflowConfig {
    /// Load config from a TOML file with PAILFLOW_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.pailflow/pailflow.toml
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let mut config: PailflowConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("PAILFLOW_").split("_"))
            .extract()
            .map_err(|e| PailflowError::Config(e.to_string()))?;

        config.encryption.key = std::env::var("ENCRYPTION_KEY").ok();
        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.pailflow/pailflow.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_boots_without_a_file() {
        let config = PailflowConfig::default();
        assert_eq!(config.gateway.port, DEFAULT_PORT);
        assert_eq!(
            config.placement.bot_call_rate_per_minute,
            DEFAULT_BOT_CALL_RATE_PER_MINUTE
        );
    }

    #[test]
    fn load_falls_back_to_defaults_for_missing_file() {
        let config = PailflowConfig::load(Some("/nonexistent/pailflow.toml")).unwrap();
        assert_eq!(config.gateway.bind, DEFAULT_BIND);
    }
}
