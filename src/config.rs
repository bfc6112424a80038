//! Configuration: `~/.pharmwatch/config.json` plus environment overrides

use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::services::data_loader::DEFAULT_SYMPTOM_LOG_LIMIT;
use crate::types::{LowStockPolicy, PharmwatchError, Result};

pub const ENV_STORE_URL: &str = "PHARMWATCH_STORE_URL";
pub const ENV_STORE_KEY: &str = "PHARMWATCH_STORE_KEY";
pub const ENV_ACCESS_TOKEN: &str = "PHARMWATCH_ACCESS_TOKEN";
pub const ENV_EMAIL: &str = "PHARMWATCH_EMAIL";
pub const ENV_PASSWORD: &str = "PHARMWATCH_PASSWORD";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_API_KEY_FALLBACK: &str = "API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub store_url: String,
    pub store_anon_key: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,

    /// Pre-issued access token; skips password sign-in
    pub access_token: Option<String>,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,

    pub symptom_log_limit: usize,
    pub ai_sample_size: usize,
    pub trend_top_n: usize,
    pub low_stock: LowStockPolicy,
    pub tracked_medicines: Vec<String>,
    pub forecast_days: u32,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_url: String::new(),
            store_anon_key: String::new(),
            gemini_api_key: None,
            gemini_model: "gemini-2.5-flash".to_string(),
            access_token: None,
            email: None,
            password: None,
            symptom_log_limit: DEFAULT_SYMPTOM_LOG_LIMIT,
            ai_sample_size: 50,
            trend_top_n: 5,
            low_stock: LowStockPolicy::default(),
            tracked_medicines: ["Paracetamol", "Ibuprofen", "Oseltamivir"]
                .into_iter()
                .map(String::from)
                .collect(),
            forecast_days: 7,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// `~/.pharmwatch/config.json`
    pub fn default_path() -> Result<PathBuf> {
        let base_dirs = BaseDirs::new()
            .ok_or_else(|| PharmwatchError::Config("Cannot determine home directory".into()))?;
        Ok(base_dirs.home_dir().join(".pharmwatch").join("config.json"))
    }

    /// Load from `path` (or the default location), apply process environment
    /// overrides, then validate.
    ///
    /// A missing file at the default location yields defaults; a missing
    /// explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_path(path)?,
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::from_path(&path)?
                } else {
                    tracing::debug!(path = %path.display(), "no config file, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PharmwatchError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            PharmwatchError::Config(format!("invalid config {}: {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Overlay values from `lookup` (normally the process environment).
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_STORE_URL) {
            self.store_url = v;
        }
        if let Some(v) = get(ENV_STORE_KEY) {
            self.store_anon_key = v;
        }
        if let Some(v) = get(ENV_ACCESS_TOKEN) {
            self.access_token = Some(v);
        }
        if let Some(v) = get(ENV_EMAIL) {
            self.email = Some(v);
        }
        if let Some(v) = get(ENV_PASSWORD) {
            self.password = Some(v);
        }
        if let Some(v) = get(ENV_GEMINI_API_KEY).or_else(|| get(ENV_API_KEY_FALLBACK)) {
            self.gemini_api_key = Some(v);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.store_url.trim().is_empty() {
            return Err(PharmwatchError::Config(format!(
                "store_url is not set (config file or {})",
                ENV_STORE_URL
            )));
        }
        if self.low_stock.assumed_capacity == 0 {
            return Err(PharmwatchError::Config(
                "low_stock.assumed_capacity must be greater than 0".into(),
            ));
        }
        let threshold = self.low_stock.threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(PharmwatchError::Config(format!(
                "low_stock.threshold must be in (0, 1], got {}",
                threshold
            )));
        }
        for (name, value) in [
            ("symptom_log_limit", self.symptom_log_limit),
            ("ai_sample_size", self.ai_sample_size),
            ("trend_top_n", self.trend_top_n),
            ("request_timeout_secs", self.request_timeout_secs as usize),
            ("forecast_days", self.forecast_days as usize),
        ] {
            if value == 0 {
                return Err(PharmwatchError::Config(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn valid() -> Config {
        Config {
            store_url: "https://example.supabase.co".to_string(),
            ..Config::default()
        }
    }

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // ========== defaults tests ==========

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.gemini_model, "gemini-2.5-flash");
        assert_eq!(config.symptom_log_limit, 500);
        assert_eq!(config.ai_sample_size, 50);
        assert_eq!(config.trend_top_n, 5);
        assert_eq!(config.forecast_days, 7);
        assert_eq!(config.tracked_medicines.len(), 3);
        assert_eq!(config.low_stock, LowStockPolicy::default());
    }

    // ========== from_path tests ==========

    #[test]
    fn test_from_path_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"store_url": "https://x.supabase.co", "low_stock": {{"threshold": 0.5}}}}"#
        )
        .unwrap();

        let config = Config::from_path(file.path()).unwrap();

        assert_eq!(config.store_url, "https://x.supabase.co");
        assert_eq!(config.low_stock.threshold, 0.5);
        assert_eq!(config.low_stock.assumed_capacity, 200);
        assert_eq!(config.symptom_log_limit, 500);
    }

    #[test]
    fn test_from_path_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = Config::from_path(file.path()).unwrap_err();
        assert!(matches!(err, PharmwatchError::Config(_)));
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.json"))).unwrap_err();
        assert!(matches!(err, PharmwatchError::Config(_)));
    }

    #[test]
    fn test_password_not_serialized() {
        let config = Config {
            password: Some("secret".to_string()),
            ..valid()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }

    // ========== apply_overrides tests ==========

    #[test]
    fn test_overrides_applied() {
        let vars = env(&[
            (ENV_STORE_URL, "https://env.supabase.co"),
            (ENV_STORE_KEY, "anon"),
            (ENV_ACCESS_TOKEN, "tok"),
            (ENV_EMAIL, "admin@example.org"),
            (ENV_PASSWORD, "pw"),
            (ENV_GEMINI_API_KEY, "gem"),
        ]);
        let mut config = Config::default();

        config.apply_overrides(|k| vars.get(k).cloned());

        assert_eq!(config.store_url, "https://env.supabase.co");
        assert_eq!(config.store_anon_key, "anon");
        assert_eq!(config.access_token.as_deref(), Some("tok"));
        assert_eq!(config.email.as_deref(), Some("admin@example.org"));
        assert_eq!(config.password.as_deref(), Some("pw"));
        assert_eq!(config.gemini_api_key.as_deref(), Some("gem"));
    }

    #[test]
    fn test_api_key_fallback() {
        let vars = env(&[(ENV_API_KEY_FALLBACK, "fallback")]);
        let mut config = Config::default();

        config.apply_overrides(|k| vars.get(k).cloned());

        assert_eq!(config.gemini_api_key.as_deref(), Some("fallback"));
    }

    #[test]
    fn test_empty_override_ignored() {
        let vars = env(&[(ENV_STORE_URL, "  ")]);
        let mut config = valid();

        config.apply_overrides(|k| vars.get(k).cloned());

        assert_eq!(config.store_url, "https://example.supabase.co");
    }

    // ========== validate tests ==========

    #[test]
    fn test_validate_ok() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_url() {
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn test_validate_zero_capacity() {
        let mut config = valid();
        config.low_stock.assumed_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_threshold_range() {
        let mut config = valid();
        config.low_stock.threshold = 0.0;
        assert!(config.validate().is_err());
        config.low_stock.threshold = 1.5;
        assert!(config.validate().is_err());
        config.low_stock.threshold = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_limit() {
        let config = Config {
            symptom_log_limit: 0,
            ..valid()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("symptom_log_limit"));
    }
}
