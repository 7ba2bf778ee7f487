//! Configuration management

use crate::error::{ErrorContext, ParcelError, ParcelResult};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration, loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParcelConfig {
    pub session: SessionTimings,
    pub lifetimes: LifetimeConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

/// Timers driving the session lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTimings {
    /// Minutes without qualifying input before a session counts as idle
    pub inactivity_window_minutes: u32,
    /// How close to expiry (minutes) an active session gets revalidated
    pub renewal_window_minutes: u32,
    /// Minutes past expiry an active session survives before hard logout
    pub grace_period_minutes: u32,
    /// Period of the expiry check
    pub revalidation_interval_secs: u64,
    /// Coalescing window for activity events
    pub activity_debounce_ms: u64,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            inactivity_window_minutes: 45,
            renewal_window_minutes: 10,
            grace_period_minutes: 5,
            revalidation_interval_secs: 5 * 60,
            activity_debounce_ms: 1000,
        }
    }
}

impl SessionTimings {
    pub fn inactivity_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.inactivity_window_minutes))
    }

    pub fn renewal_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.renewal_window_minutes))
    }

    pub fn grace_period(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.grace_period_minutes))
    }

    pub fn revalidation_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.revalidation_interval_secs)
    }

    /// Saturates instead of wrapping; `validate` rejects such values anyway.
    pub fn activity_debounce(&self) -> chrono::Duration {
        let millis = i64::try_from(self.activity_debounce_ms).unwrap_or(i64::MAX);
        chrono::Duration::milliseconds(millis)
    }
}

/// Token lifetime per role class, in hours
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifetimeConfig {
    pub customer_hours: u32,
    pub admin_hours: u32,
    pub default_hours: u32,
}

impl Default for LifetimeConfig {
    fn default() -> Self {
        Self {
            customer_hours: 4,
            admin_hours: 12,
            default_hours: 8,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Where the persisted session lives; the platform data dir when unset
    pub session_file: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the session file location
    pub fn resolve_session_file(&self) -> PathBuf {
        if let Some(path) = &self.session_file {
            return path.clone();
        }

        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parcelgate")
            .join("session.json")
    }
}

/// Backend REST service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            request_timeout_secs: 15,
        }
    }
}

impl ParcelConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ParcelResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ParcelError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: ParcelConfig = toml::from_str(&content).map_err(|e| ParcelError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> ParcelResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ParcelError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        let path = path.as_ref();
        std::fs::write(path, content).map_err(|e| ParcelError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        crate::log_operation_success!("save_config", path = %path.display());
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> ParcelResult<()> {
        let session = &self.session;

        if session.inactivity_window_minutes == 0 {
            return Err(crate::validation_error!(
                "Inactivity window must be greater than 0",
                "session.inactivity_window_minutes",
                "config"
            ));
        }

        if session.revalidation_interval_secs == 0 {
            return Err(crate::validation_error!(
                "Revalidation interval must be greater than 0",
                "session.revalidation_interval_secs",
                "config"
            ));
        }

        // A debounce as long as the idle window would hide all activity.
        let inactivity_ms = u64::from(session.inactivity_window_minutes) * 60 * 1000;
        if session.activity_debounce_ms >= inactivity_ms {
            return Err(crate::validation_error!(
                "Activity debounce must be shorter than the inactivity window",
                "session.activity_debounce_ms",
                "config"
            ));
        }

        let lifetimes = &self.lifetimes;
        for (field, hours) in [
            ("lifetimes.customer_hours", lifetimes.customer_hours),
            ("lifetimes.admin_hours", lifetimes.admin_hours),
            ("lifetimes.default_hours", lifetimes.default_hours),
        ] {
            if hours == 0 {
                return Err(crate::validation_error!(
                    "Token lifetime must be greater than 0",
                    field,
                    "config"
                ));
            }
            // The renewal window has to open after login, not before it.
            if i64::from(hours) * 60 <= i64::from(session.renewal_window_minutes) {
                return Err(crate::validation_error!(
                    "Token lifetime must exceed the renewal window",
                    field,
                    "config"
                ));
            }
        }

        url::Url::parse(&self.api.base_url).map_err(|e| ParcelError::Config {
            message: format!("Invalid api.base_url '{}': {}", self.api.base_url, e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("validate")
                .with_suggestion("Use an absolute URL such as https://desk.example.com/api"),
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_session_policy() {
        let config = ParcelConfig::default();
        assert_eq!(config.session.inactivity_window(), chrono::Duration::minutes(45));
        assert_eq!(config.session.renewal_window(), chrono::Duration::minutes(10));
        assert_eq!(config.session.grace_period(), chrono::Duration::minutes(5));
        assert_eq!(
            config.session.revalidation_interval(),
            std::time::Duration::from_secs(300)
        );
        assert_eq!(
            config.session.activity_debounce(),
            chrono::Duration::milliseconds(1000)
        );
        assert_eq!(config.lifetimes.customer_hours, 4);
        assert_eq!(config.lifetimes.admin_hours, 12);
        assert_eq!(config.lifetimes.default_hours, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_lifetime() {
        let mut config = ParcelConfig::default();
        config.lifetimes.customer_hours = 0;
        assert!(matches!(
            config.validate(),
            Err(ParcelError::Validation { .. })
        ));
    }

    #[test]
    fn test_oversized_debounce_is_rejected_not_wrapped() {
        let mut config = ParcelConfig::default();
        config.session.activity_debounce_ms = u64::MAX;

        assert!(config.session.activity_debounce() > chrono::Duration::zero());
        match config.validate() {
            Err(ParcelError::Validation { field, .. }) => {
                assert_eq!(field.as_deref(), Some("session.activity_debounce_ms"))
            }
            other => panic!("expected a validation error, got {other:?}"),
        }

        config.session.activity_debounce_ms = 45 * 60 * 1000 - 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = ParcelConfig::default();
        config.api.base_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ParcelError::Config { .. })));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ParcelConfig = toml::from_str(
            r#"
            [session]
            inactivity_window_minutes = 30

            [api]
            base_url = "https://desk.example.com/api"
            "#,
        )
        .unwrap();

        assert_eq!(config.session.inactivity_window_minutes, 30);
        assert_eq!(config.session.grace_period_minutes, 5);
        assert_eq!(config.lifetimes.admin_hours, 12);
        assert_eq!(config.api.base_url, "https://desk.example.com/api");
    }

    #[test]
    fn test_explicit_session_file_wins() {
        let storage = StorageConfig {
            session_file: Some(PathBuf::from("/tmp/pg/session.json")),
        };
        assert_eq!(
            storage.resolve_session_file(),
            PathBuf::from("/tmp/pg/session.json")
        );

        let default_path = StorageConfig::default().resolve_session_file();
        assert!(default_path.ends_with("parcelgate/session.json"));
    }
}
