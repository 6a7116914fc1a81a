//! Environment-driven runtime configuration.
//!
//! # Responsibility
//! - Resolve database path, collection, schema profile and logging options.
//! - Validate values once so callers receive a usable config.
//!
//! # Invariants
//! - Unset variables fall back to documented defaults.
//! - Set-but-invalid variables are rejected, never silently defaulted.

use crate::logging::default_log_level;
use crate::model::registration::{SchemaProfile, DEFAULT_COLLECTION};
use crate::store::validate_name;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "COURSE_REGISTRY_DB";
pub const ENV_COLLECTION: &str = "COURSE_REGISTRY_COLLECTION";
pub const ENV_PROFILE: &str = "COURSE_REGISTRY_PROFILE";
pub const ENV_LOG_LEVEL: &str = "COURSE_REGISTRY_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "COURSE_REGISTRY_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "course_registry.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidProfile(String),
    InvalidCollection(String),
    EmptyValue(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidProfile(value) => {
                write!(f, "unsupported profile `{value}`; expected enrollment|inquiry")
            }
            Self::InvalidCollection(value) => write!(f, "invalid collection name `{value}`"),
            Self::EmptyValue(key) => write!(f, "{key} is set but empty"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// SQLite database file backing the document store.
    pub db_path: PathBuf,
    pub collection: String,
    pub profile: SchemaProfile,
    pub log_level: String,
    /// Rolling log directory; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            collection: DEFAULT_COLLECTION.to_string(),
            profile: SchemaProfile::default(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl RegistryConfig {
    /// Loads `.env` (if present) and reads `COURSE_REGISTRY_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = non_empty(&lookup, ENV_DB_PATH)? {
            config.db_path = PathBuf::from(path);
        }
        if let Some(collection) = non_empty(&lookup, ENV_COLLECTION)? {
            config.set_collection(collection)?;
        }
        if let Some(profile) = non_empty(&lookup, ENV_PROFILE)? {
            config.set_profile(&profile)?;
        }
        if let Some(level) = non_empty(&lookup, ENV_LOG_LEVEL)? {
            config.log_level = level;
        }
        if let Some(dir) = non_empty(&lookup, ENV_LOG_DIR)? {
            config.log_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }

    pub fn set_collection(&mut self, collection: impl Into<String>) -> Result<(), ConfigError> {
        let collection = collection.into();
        if validate_name("collection", &collection).is_err() {
            return Err(ConfigError::InvalidCollection(collection));
        }
        self.collection = collection;
        Ok(())
    }

    pub fn set_profile(&mut self, profile: &str) -> Result<(), ConfigError> {
        self.profile = SchemaProfile::parse(profile)
            .ok_or_else(|| ConfigError::InvalidProfile(profile.to_string()))?;
        Ok(())
    }
}

fn non_empty(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<String>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Err(ConfigError::EmptyValue(key)),
        Some(value) => Ok(Some(value.trim().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, RegistryConfig, ENV_COLLECTION, ENV_DB_PATH, ENV_PROFILE};
    use crate::model::registration::SchemaProfile;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = RegistryConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, RegistryConfig::default());
        assert_eq!(config.collection, "registrations");
        assert_eq!(config.profile, SchemaProfile::Enrollment);
    }

    #[test]
    fn variables_override_defaults() {
        let config = RegistryConfig::from_lookup(lookup_from(&[
            (ENV_DB_PATH, "/tmp/reg.sqlite3"),
            (ENV_COLLECTION, "spring_courses"),
            (ENV_PROFILE, "inquiry"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/reg.sqlite3"));
        assert_eq!(config.collection, "spring_courses");
        assert_eq!(config.profile, SchemaProfile::Inquiry);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = RegistryConfig::from_lookup(lookup_from(&[(ENV_PROFILE, "survey")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidProfile("survey".to_string()));

        let err =
            RegistryConfig::from_lookup(lookup_from(&[(ENV_COLLECTION, "a/b")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidCollection("a/b".to_string()));

        let err = RegistryConfig::from_lookup(lookup_from(&[(ENV_DB_PATH, "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::EmptyValue(ENV_DB_PATH));
    }
}
