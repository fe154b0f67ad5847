use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

pub const DEV_JWT_SECRET: &str = "upkeep-development-secret-change-me";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub invitation: InvitationConfig,
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
    /// Upper bound on any single store call
    pub call_timeout_ms: u64,
    pub store_backend: StoreBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
    pub enable_audit_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationConfig {
    /// Base URL of the web client; invite links point at `<frontend_url>/signup`
    pub frontend_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub from_address: String,
    pub primary: Option<EmailProviderConfig>,
    pub fallback: Option<EmailProviderConfig>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailProviderConfig {
    pub name: String,
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub api_key: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set to a non-default value in production")]
    DefaultSecretInProduction,

    #[error("DATABASE_URL is required for the postgres store backend")]
    MissingDatabaseUrl,

    #[error("FRONTEND_URL is not a valid URL: {0}")]
    InvalidFrontendUrl(String),
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("PORT").or_else(|_| env::var("UPKEEP_API_PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("API_REQUEST_TIMEOUT_SECS") {
            self.server.request_timeout_secs = v.parse().unwrap_or(self.server.request_timeout_secs);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_CALL_TIMEOUT_MS") {
            self.database.call_timeout_ms = v.parse().unwrap_or(self.database.call_timeout_ms);
        }
        match env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => self.database.store_backend = StoreBackend::Memory,
            Ok("postgres") => self.database.store_backend = StoreBackend::Postgres,
            _ => {}
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_AUDIT_LOGGING") {
            self.security.enable_audit_logging = v.parse().unwrap_or(self.security.enable_audit_logging);
        }

        // Invitation / email overrides
        if let Ok(v) = env::var("FRONTEND_URL") {
            self.invitation.frontend_url = v;
        }
        if let Ok(v) = env::var("EMAIL_FROM") {
            self.email.from_address = v;
        }
        if let Ok(v) = env::var("EMAIL_TIMEOUT_SECS") {
            self.email.timeout_secs = v.parse().unwrap_or(self.email.timeout_secs);
        }
        if let Some(provider) = provider_from_env("EMAIL_PRIMARY", "primary") {
            self.email.primary = Some(provider);
        }
        if let Some(provider) = provider_from_env("EMAIL_FALLBACK", "fallback") {
            self.email.fallback = Some(provider);
        }

        self
    }

    /// Reject configurations that must not reach a running server.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.environment == Environment::Production
            && (self.security.jwt_secret.is_empty() || self.security.jwt_secret == DEV_JWT_SECRET)
        {
            return Err(ConfigError::DefaultSecretInProduction);
        }
        if self.database.store_backend == StoreBackend::Postgres && self.database.url.is_empty() {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        if let Err(e) = url::Url::parse(&self.invitation.frontend_url) {
            return Err(ConfigError::InvalidFrontendUrl(e.to_string()));
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.database.call_timeout_ms)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 9001,
                request_timeout_secs: 30,
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 10,
                connection_timeout: 30,
                call_timeout_ms: 5000,
                store_backend: StoreBackend::Postgres,
            },
            security: SecurityConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                enable_audit_logging: true,
            },
            invitation: InvitationConfig {
                frontend_url: "http://localhost:5173".to_string(),
            },
            email: EmailConfig {
                from_address: "Upkeep <noreply@localhost>".to_string(),
                primary: None,
                fallback: None,
                timeout_secs: 10,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 9001,
                request_timeout_secs: 20,
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 20,
                connection_timeout: 10,
                call_timeout_ms: 5000,
                store_backend: StoreBackend::Postgres,
            },
            security: SecurityConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24,
                cors_origins: vec!["https://staging.example.com".to_string()],
                enable_audit_logging: true,
            },
            invitation: InvitationConfig {
                frontend_url: "https://staging.example.com".to_string(),
            },
            email: EmailConfig {
                from_address: "Upkeep <noreply@staging.example.com>".to_string(),
                primary: None,
                fallback: None,
                timeout_secs: 10,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 9001,
                request_timeout_secs: 15,
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 50,
                connection_timeout: 5,
                call_timeout_ms: 3000,
                store_backend: StoreBackend::Postgres,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                cors_origins: vec!["https://app.example.com".to_string()],
                enable_audit_logging: true,
            },
            invitation: InvitationConfig {
                frontend_url: "https://app.example.com".to_string(),
            },
            email: EmailConfig {
                from_address: "Upkeep <noreply@example.com>".to_string(),
                primary: None,
                fallback: None,
                timeout_secs: 5,
            },
        }
    }
}

fn provider_from_env(prefix: &str, name: &str) -> Option<EmailProviderConfig> {
    let endpoint = env::var(format!("{}_URL", prefix)).ok()?;
    let api_key = env::var(format!("{}_API_KEY", prefix)).unwrap_or_default();
    Some(EmailProviderConfig {
        name: name.to_string(),
        endpoint,
        api_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.database.call_timeout_ms, 5000);
        assert_eq!(config.call_timeout(), Duration::from_millis(5000));
        assert!(config.email.primary.is_none());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.is_production());
        assert_eq!(config.security.jwt_expiry_hours, 4);
    }

    #[test]
    fn test_production_requires_real_secret() {
        let mut config = AppConfig::production();
        config.database.url = "postgres://localhost/upkeep".into();
        assert!(matches!(config.validate(), Err(ConfigError::DefaultSecretInProduction)));

        config.security.jwt_secret = DEV_JWT_SECRET.into();
        assert!(matches!(config.validate(), Err(ConfigError::DefaultSecretInProduction)));

        config.security.jwt_secret = "a-long-random-production-secret".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_memory_backend_needs_no_database_url() {
        let mut config = AppConfig::development();
        assert!(matches!(config.validate(), Err(ConfigError::MissingDatabaseUrl)));

        config.database.store_backend = StoreBackend::Memory;
        assert!(config.validate().is_ok());
    }
}
