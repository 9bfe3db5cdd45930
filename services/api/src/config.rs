use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub caregiver_email: String,
    pub primary_family_email: String,
    pub escalation_secs: u64,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let caregiver_email = std::env::var("CAREGIVER_EMAIL")
            .unwrap_or_else(|_| "caregiver@example.com".to_string());
        let primary_family_email = std::env::var("PRIMARY_FAMILY_EMAIL")
            .unwrap_or_else(|_| "family@example.com".to_string());

        let escalation_str =
            std::env::var("ESCALATION_SECONDS").unwrap_or_else(|_| "60".to_string());
        let escalation_secs = escalation_str.parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(
                "ESCALATION_SECONDS".to_string(),
                format!("'{}' is not a valid number of seconds", escalation_str),
            )
        })?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            caregiver_email,
            primary_family_email,
            escalation_secs,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tracing::Level;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("BIND_ADDRESS");
            env::remove_var("CAREGIVER_EMAIL");
            env::remove_var("PRIMARY_FAMILY_EMAIL");
            env::remove_var("ESCALATION_SECONDS");
            env::remove_var("RUST_LOG");
        }
    }

    #[test]
    fn test_config_error_display() {
        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        clear_env_vars();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.caregiver_email, "caregiver@example.com");
        assert_eq!(config.primary_family_email, "family@example.com");
        assert_eq!(config.escalation_secs, 60);
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:8080");
            env::set_var("CAREGIVER_EMAIL", "nurse@example.org");
            env::set_var("PRIMARY_FAMILY_EMAIL", "kids@example.org");
            env::set_var("ESCALATION_SECONDS", "15");
            env::set_var("RUST_LOG", "debug");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.caregiver_email, "nurse@example.org");
        assert_eq!(config.primary_family_email, "kids@example.org");
        assert_eq!(config.escalation_secs, 15);
        assert_eq!(config.log_level, Level::DEBUG);

        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }

        let ConfigError::InvalidValue(var, _) = Config::from_env().unwrap_err();
        assert_eq!(var, "BIND_ADDRESS");

        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_invalid_escalation_seconds() {
        clear_env_vars();
        unsafe {
            env::set_var("ESCALATION_SECONDS", "soon");
        }

        let ConfigError::InvalidValue(var, _) = Config::from_env().unwrap_err();
        assert_eq!(var, "ESCALATION_SECONDS");

        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let ConfigError::InvalidValue(var, _) = Config::from_env().unwrap_err();
        assert_eq!(var, "RUST_LOG");

        clear_env_vars();
    }
}
