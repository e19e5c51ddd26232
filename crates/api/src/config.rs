//! Server configuration loaded from the environment

use std::path::PathBuf;

use crate::error::ApiError;

/// Deployment environment, controls the `Secure` flag on session cookies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn from_env() -> Self {
        match std::env::var("ENVIRONMENT").as_deref() {
            Ok("production") => Self::Production,
            _ => Self::Development,
        }
    }

    /// Cookies carry `Secure` everywhere except local development.
    pub fn secure_cookies(self) -> bool {
        self == Self::Production
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_address: String,
    pub environment: Environment,
    pub allowed_origins: Vec<String>,
    pub upload_dir: PathBuf,
}

impl Config {
    /// Load configuration, failing fast on missing secrets.
    ///
    /// The process must not serve traffic without a signing key, so a
    /// missing `JWT_SECRET` or `DATABASE_URL` is fatal here rather than a
    /// per-request error later.
    pub fn from_env() -> Result<Self, ApiError> {
        let database_url = require_var("DATABASE_URL")?;
        let jwt_secret = require_var("JWT_SECRET")?;

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5000".to_string());

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let upload_dir = std::env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));

        Ok(Self {
            database_url,
            jwt_secret,
            bind_address,
            environment: Environment::from_env(),
            allowed_origins,
            upload_dir,
        })
    }
}

fn require_var(name: &'static str) -> Result<String, ApiError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Configuration(format!("{name} is not set")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn set_required_vars() {
        std::env::set_var("DATABASE_URL", "postgresql://localhost/forgeboard");
        std::env::set_var("JWT_SECRET", "test-secret-key-at-least-32-chars!");
    }

    #[test]
    #[serial]
    fn missing_jwt_secret_is_a_configuration_error() {
        set_required_vars();
        std::env::remove_var("JWT_SECRET");

        let result = Config::from_env();
        assert!(matches!(result, Err(ApiError::Configuration(_))));
    }

    #[test]
    #[serial]
    fn defaults_applied_when_optional_vars_absent() {
        set_required_vars();
        std::env::remove_var("BIND_ADDRESS");
        std::env::remove_var("ENVIRONMENT");
        std::env::remove_var("ALLOWED_ORIGINS");
        std::env::remove_var("UPLOAD_DIR");

        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:5000");
        assert_eq!(config.environment, Environment::Development);
        assert!(!config.environment.secure_cookies());
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
    }

    #[test]
    #[serial]
    fn production_environment_enables_secure_cookies() {
        set_required_vars();
        std::env::set_var("ENVIRONMENT", "production");

        let config = Config::from_env().unwrap();
        assert!(config.environment.secure_cookies());

        std::env::remove_var("ENVIRONMENT");
    }

    #[test]
    #[serial]
    fn allowed_origins_are_split_and_trimmed() {
        set_required_vars();
        std::env::set_var(
            "ALLOWED_ORIGINS",
            "https://app.example.com, https://admin.example.com",
        );

        let config = Config::from_env().unwrap();
        assert_eq!(
            config.allowed_origins,
            vec![
                "https://app.example.com".to_string(),
                "https://admin.example.com".to_string()
            ]
        );

        std::env::remove_var("ALLOWED_ORIGINS");
    }
}
