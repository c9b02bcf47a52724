use serde::Deserialize;
use std::env;

use crate::services::mastery::ThresholdScale;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_METRICS_AUTH: &str = "admin:changeme";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    /// OTLP/HTTP collector; span export is disabled when unset
    pub otlp_endpoint: Option<String>,
    /// `user:password` expected on `/metrics`
    pub metrics_auth: String,
    pub threshold_scale: ThresholdScale,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            otlp_endpoint: None,
            metrics_auth: DEFAULT_METRICS_AUTH.to_string(),
            threshold_scale: ThresholdScale::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first (two levels up), then the local one
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/{env}.toml, then APP__SECTION__KEY overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", app_env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Self::from_settings(&settings, &app_env)
    }

    fn from_settings(settings: &config::Config, app_env: &str) -> Result<Self, config::ConfigError> {
        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        let otlp_endpoint = settings
            .get_string("telemetry.otlp_endpoint")
            .or_else(|_| env::var("OTEL_EXPORTER_OTLP_ENDPOINT"))
            .ok()
            .filter(|endpoint| !endpoint.trim().is_empty());

        let metrics_auth = match settings
            .get_string("metrics.auth")
            .or_else(|_| env::var("METRICS_AUTH"))
        {
            Ok(auth) => auth,
            Err(_) if app_env == "prod" => {
                return Err(config::ConfigError::Message(
                    "METRICS_AUTH must be set in production".to_string(),
                ));
            }
            Err(_) => {
                eprintln!("WARNING: Using default METRICS_AUTH (dev mode only!)");
                DEFAULT_METRICS_AUTH.to_string()
            }
        };

        let threshold_scale = match settings
            .get_string("progress.threshold_scale")
            .or_else(|_| env::var("PROGRESS_THRESHOLD_SCALE"))
        {
            Ok(raw) => raw.parse().map_err(config::ConfigError::Message)?,
            Err(_) => ThresholdScale::default(),
        };

        Ok(Config {
            bind_addr,
            otlp_endpoint,
            metrics_auth,
            threshold_scale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 7] = [
        "BIND_ADDR",
        "OTEL_EXPORTER_OTLP_ENDPOINT",
        "METRICS_AUTH",
        "PROGRESS_THRESHOLD_SCALE",
        "APP__SERVER__BIND_ADDR",
        "APP__PROGRESS__THRESHOLD_SCALE",
        "APP__METRICS__AUTH",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    fn empty_settings() -> config::Config {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()
            .unwrap()
    }

    #[test]
    #[serial]
    fn defaults_apply_without_overrides() {
        clear_env();
        let config = Config::from_settings(&empty_settings(), "dev").unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.otlp_endpoint, None);
        assert_eq!(config.metrics_auth, DEFAULT_METRICS_AUTH);
        assert_eq!(config.threshold_scale, ThresholdScale::Normalized);
    }

    #[test]
    #[serial]
    fn plain_env_fallbacks_are_read() {
        clear_env();
        env::set_var("BIND_ADDR", "127.0.0.1:9000");
        env::set_var("PROGRESS_THRESHOLD_SCALE", "legacy");
        env::set_var("OTEL_EXPORTER_OTLP_ENDPOINT", "http://collector:4318");

        let config = Config::from_settings(&empty_settings(), "dev").unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.threshold_scale, ThresholdScale::Legacy);
        assert_eq!(config.otlp_endpoint.as_deref(), Some("http://collector:4318"));
        clear_env();
    }

    #[test]
    #[serial]
    fn prefixed_env_wins_over_plain_env() {
        clear_env();
        env::set_var("BIND_ADDR", "127.0.0.1:9000");
        env::set_var("APP__SERVER__BIND_ADDR", "127.0.0.1:7000");

        let config = Config::from_settings(&empty_settings(), "dev").unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:7000");
        clear_env();
    }

    #[test]
    #[serial]
    fn unknown_threshold_scale_is_an_error() {
        clear_env();
        env::set_var("PROGRESS_THRESHOLD_SCALE", "percent");
        assert!(Config::from_settings(&empty_settings(), "dev").is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn production_requires_metrics_auth() {
        clear_env();
        assert!(Config::from_settings(&empty_settings(), "prod").is_err());

        env::set_var("METRICS_AUTH", "ops:secret");
        let config = Config::from_settings(&empty_settings(), "prod").unwrap();
        assert_eq!(config.metrics_auth, "ops:secret");
        clear_env();
    }
}
