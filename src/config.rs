// src/config.rs
use std::{env, str::FromStr};

use crate::{
    errors::{KekeError, KekeResult},
    models::pricing::{PlatformSettings, DEFAULT_COMMISSION_RATE},
};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub commission_rate: f64,
    pub surge_multiplier: f64,
    pub auto_dispatch: bool,  // Drive booked rides through the timed simulation
    pub seed_demo_data: bool,
    pub start_scheduler: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            commission_rate: DEFAULT_COMMISSION_RATE,
            surge_multiplier: 1.0,
            auto_dispatch: true,
            seed_demo_data: true,
            start_scheduler: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> KekeResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, falling back to defaults for
    /// missing or blank values.
    pub fn from_lookup<F>(lookup: F) -> KekeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let config = Self {
            bind_addr: get("KEKE_BIND_ADDR").unwrap_or(defaults.bind_addr),
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            commission_rate: parse_or(get("KEKE_COMMISSION_RATE"), "KEKE_COMMISSION_RATE", defaults.commission_rate)?,
            surge_multiplier: parse_or(get("KEKE_SURGE"), "KEKE_SURGE", defaults.surge_multiplier)?,
            auto_dispatch: parse_flag(get("KEKE_AUTO_DISPATCH"), "KEKE_AUTO_DISPATCH", defaults.auto_dispatch)?,
            seed_demo_data: parse_flag(get("KEKE_SEED_DEMO_DATA"), "KEKE_SEED_DEMO_DATA", defaults.seed_demo_data)?,
            start_scheduler: parse_flag(get("KEKE_START_SCHEDULER"), "KEKE_START_SCHEDULER", defaults.start_scheduler)?,
        };

        if !config.gemini_base_url.starts_with("http://") && !config.gemini_base_url.starts_with("https://") {
            return Err(KekeError::InvalidConfiguration(
                "GEMINI_BASE_URL must start with http:// or https://".to_string(),
            ));
        }
        if config.surge_multiplier < 1.0 {
            return Err(KekeError::InvalidConfiguration("KEKE_SURGE must be at least 1.0".to_string()));
        }
        if !(0.0..=100.0).contains(&config.commission_rate) {
            return Err(KekeError::InvalidConfiguration(
                "KEKE_COMMISSION_RATE must be between 0 and 100".to_string(),
            ));
        }

        Ok(config)
    }

    pub fn platform_settings(&self) -> PlatformSettings {
        PlatformSettings {
            surge_multiplier: self.surge_multiplier,
            commission_rate: self.commission_rate,
            ..Default::default()
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> KekeResult<T> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| KekeError::InvalidConfiguration(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(default),
    }
}

fn parse_flag(value: Option<String>, key: &str, default: bool) -> KekeResult<bool> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(KekeError::InvalidConfiguration(format!(
            "{} must be true or false, got {}",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> KekeResult<AppConfig> {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert!(config.gemini_api_key.is_none());
        assert!(config.auto_dispatch);
        assert_eq!(config.platform_settings(), PlatformSettings::default());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("GEMINI_API_KEY", "abc"),
            ("KEKE_SURGE", "1.25"),
            ("KEKE_AUTO_DISPATCH", "off"),
            ("KEKE_BIND_ADDR", "127.0.0.1:8080"),
        ])
        .unwrap();
        assert_eq!(config.gemini_api_key.as_deref(), Some("abc"));
        assert_eq!(config.surge_multiplier, 1.25);
        assert!(!config.auto_dispatch);
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_blank_key_means_no_key() {
        let config = config_from(&[("GEMINI_API_KEY", "   ")]).unwrap();
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(config_from(&[("KEKE_SURGE", "0.5")]).is_err());
        assert!(config_from(&[("KEKE_SURGE", "lots")]).is_err());
        assert!(config_from(&[("KEKE_COMMISSION_RATE", "120")]).is_err());
        assert!(config_from(&[("KEKE_SEED_DEMO_DATA", "maybe")]).is_err());
        assert!(config_from(&[("GEMINI_BASE_URL", "ftp://x")]).is_err());
    }
}
