//! Application settings loaded from environment variables.

use std::env;
use std::path::PathBuf;

use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};

use super::constants::{
    DEFAULT_ACCESS_TOKEN_TTL, DEFAULT_DATABASE_MAX_CONNECTIONS, DEFAULT_DATABASE_URL,
    DEFAULT_IMAGE_DIR, DEFAULT_REFRESH_TOKEN_TTL, DEFAULT_SEED_ADMIN_EMAIL,
    DEFAULT_SEED_ADMIN_PASSWORD, DEV_JWT_SECRET, MIN_JWT_SECRET_LENGTH,
};
use crate::errors::{AppError, AppResult};

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub auth: AuthConfig,
    pub image_dir: PathBuf,
    pub seed_admin_email: String,
    seed_admin_password: SecretString,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("database_max_connections", &self.database_max_connections)
            .field("auth", &self.auth)
            .field("image_dir", &self.image_dir)
            .field("seed_admin_email", &self.seed_admin_email)
            .field("seed_admin_password", &"[REDACTED]")
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Fails when JWT_SECRET is missing in a release build, too short, or a
    /// TTL cannot be parsed.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
            auth: AuthConfig::from_env()?,
            image_dir: env::var("IMAGE_DIR")
                .unwrap_or_else(|_| DEFAULT_IMAGE_DIR.to_string())
                .into(),
            seed_admin_email: env::var("SEED_ADMIN_EMAIL")
                .unwrap_or_else(|_| DEFAULT_SEED_ADMIN_EMAIL.to_string()),
            seed_admin_password: env::var("SEED_ADMIN_PASSWORD")
                .unwrap_or_else(|_| DEFAULT_SEED_ADMIN_PASSWORD.to_string())
                .into(),
        })
    }

    /// Password for the seeded admin account.
    pub fn seed_admin_password(&self) -> &str {
        self.seed_admin_password.expose_secret()
    }
}

/// Token settings injected into the authenticator.
///
/// Defaults: access tokens live 15 minutes, refresh tokens 7 days.
#[derive(Clone)]
pub struct AuthConfig {
    jwt_secret: SecretString,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .finish()
    }
}

impl AuthConfig {
    /// Build a configuration from explicit values.
    ///
    /// # Errors
    /// Returns a validation error if the secret is shorter than 32 characters.
    pub fn new(
        jwt_secret: impl Into<String>,
        access_token_ttl: Duration,
        refresh_token_ttl: Duration,
    ) -> AppResult<Self> {
        let jwt_secret = jwt_secret.into();
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(AppError::validation(format!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            )));
        }

        Ok(Self {
            jwt_secret: jwt_secret.into(),
            access_token_ttl,
            refresh_token_ttl,
        })
    }

    /// Read JWT_SECRET, JWT_ACCESS_TTL and JWT_REFRESH_TTL.
    pub fn from_env() -> AppResult<Self> {
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) if cfg!(debug_assertions) => {
                tracing::warn!("JWT_SECRET not set, using insecure default for development");
                DEV_JWT_SECRET.to_string()
            }
            Err(_) => {
                return Err(AppError::internal(
                    "JWT_SECRET environment variable must be set in production",
                ))
            }
        };

        let access = env::var("JWT_ACCESS_TTL").unwrap_or_else(|_| DEFAULT_ACCESS_TOKEN_TTL.into());
        let refresh =
            env::var("JWT_REFRESH_TTL").unwrap_or_else(|_| DEFAULT_REFRESH_TOKEN_TTL.into());

        Self::new(jwt_secret, parse_ttl(&access)?, parse_ttl(&refresh)?)
    }

    /// Get JWT secret bytes for token signing/verification.
    pub fn jwt_secret_bytes(&self) -> &[u8] {
        self.jwt_secret.expose_secret().as_bytes()
    }
}

/// Parse a lifetime such as `15m`, `7d`, `3600s` or `12h`.
pub fn parse_ttl(value: &str) -> AppResult<Duration> {
    let value = value.trim();
    let invalid = || AppError::validation(format!("Invalid duration: {:?}", value));

    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (amount, unit) = value.split_at(split);
    let amount: i64 = amount.parse().map_err(|_| invalid())?;

    match unit {
        "s" => Ok(Duration::seconds(amount)),
        "m" => Ok(Duration::minutes(amount)),
        "h" => Ok(Duration::hours(amount)),
        "d" => Ok(Duration::days(amount)),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ttl_units() {
        assert_eq!(parse_ttl("15m").unwrap(), Duration::minutes(15));
        assert_eq!(parse_ttl("7d").unwrap(), Duration::days(7));
        assert_eq!(parse_ttl("3600s").unwrap(), Duration::hours(1));
        assert_eq!(parse_ttl(" 12h ").unwrap(), Duration::hours(12));
    }

    #[test]
    fn test_parse_ttl_rejects_garbage() {
        assert!(parse_ttl("").is_err());
        assert!(parse_ttl("15").is_err());
        assert!(parse_ttl("m").is_err());
        assert!(parse_ttl("10w").is_err());
        assert!(parse_ttl("1.5h").is_err());
    }

    #[test]
    fn test_auth_config_rejects_short_secret() {
        let result = AuthConfig::new("short", Duration::minutes(15), Duration::days(7));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_auth_config_debug_redacts_secret() {
        let config = AuthConfig::new(DEV_JWT_SECRET, Duration::minutes(15), Duration::days(7))
            .unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains(DEV_JWT_SECRET));
    }
}
