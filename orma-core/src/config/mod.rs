mod loader;
pub mod section;
pub mod value;

use std::collections::HashMap;
use std::path::Path;

pub use section::{ConfigSection, DatabaseConfig};
pub use value::{ConfigValue, FromConfigValue};

/// Error type for configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    /// The requested key was not found in the configuration.
    NotFound(String),
    /// The value could not be converted to the requested type.
    TypeMismatch { key: String, expected: &'static str },
    /// An I/O or YAML parsing error occurred while loading config files.
    Load(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "Config key not found: {key}"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "Config type mismatch for '{key}': expected {expected}")
            }
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Environment variable naming the active profile.
pub const PROFILE_ENV: &str = "ORMA_PROFILE";

/// Configuration loaded from YAML files, `.env` files, and environment variables.
///
/// Resolution order (lowest to highest priority):
/// 1. `application.yaml` (base)
/// 2. `application-{profile}.yaml` (profile override)
/// 3. `.env`, then `.env.{profile}` (loaded into the process environment,
///    never overwriting variables that are already set)
/// 4. Environment variables (`ORMA_DATABASE_URL` overrides `orma.database.url`)
///
/// Profile is determined by: `ORMA_PROFILE` env var > argument.
#[derive(Debug, Clone)]
pub struct OrmaConfig {
    values: HashMap<String, ConfigValue>,
    profile: String,
}

impl OrmaConfig {
    /// Load configuration for the given profile from the working directory.
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."), profile)
    }

    /// Load configuration for the given profile from `dir`.
    pub fn load_from(dir: &Path, profile: &str) -> Result<Self, ConfigError> {
        let active_profile = std::env::var(PROFILE_ENV).unwrap_or_else(|_| profile.to_string());

        let mut values = HashMap::new();
        loader::load_yaml_file(&dir.join("application.yaml"), &mut values)?;
        loader::load_yaml_file(
            &dir.join(format!("application-{active_profile}.yaml")),
            &mut values,
        )?;

        let _ = dotenvy::from_path(dir.join(".env"));
        let _ = dotenvy::from_path(dir.join(format!(".env.{active_profile}")));

        // `orma.database.url` <-> `ORMA_DATABASE_URL`; a file key spelled
        // with underscores (`log_statements`) is overridden in place.
        for (env_key, env_val) in std::env::vars() {
            let dotted = env_key.to_lowercase().replace('_', ".");
            let spelled: Vec<String> = values
                .keys()
                .filter(|k| k.contains('_') && k.replace('_', ".") == dotted)
                .cloned()
                .collect();
            for key in spelled {
                values.insert(key, ConfigValue::String(env_val.clone()));
            }
            values.insert(dotted, ConfigValue::String(env_val));
        }

        tracing::debug!(profile = %active_profile, keys = values.len(), "configuration loaded");
        Ok(Self {
            values,
            profile: active_profile,
        })
    }

    /// Create a config from a YAML string.
    pub fn from_yaml_str(yaml: &str, profile: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::load_yaml_str(yaml, &mut values)?;
        Ok(Self {
            values,
            profile: profile.to_string(),
        })
    }

    pub fn empty() -> Self {
        Self {
            values: HashMap::new(),
            profile: "test".to_string(),
        }
    }

    pub fn set(&mut self, key: &str, value: ConfigValue) {
        self.values.insert(key.to_string(), value);
    }

    /// Value stored under `key`. Keys containing `_` also match their
    /// environment spelling (`log_statements` ↔ `log.statements`).
    fn lookup(&self, key: &str) -> Option<&ConfigValue> {
        self.values
            .get(key)
            .or_else(|| self.values.get(&key.replace('_', ".")))
    }

    /// Get a typed value for the given dot-separated key.
    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        let value = self
            .lookup(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        V::from_config_value(value, key)
    }

    /// Get a typed value, returning a default if the key is missing.
    pub fn get_or<V: FromConfigValue>(&self, key: &str, default: V) -> V {
        self.get(key).unwrap_or(default)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// The active profile name.
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Build a typed section from the raw values.
    pub fn section<S: ConfigSection>(&self) -> Result<S, ConfigError> {
        S::from_config(self)
    }
}
