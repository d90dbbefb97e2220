use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub session: SessionConfig,
    pub tenancy: TenancyConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
}

/// Where session key/value pairs are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionDriver {
    Memory,
    Database,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub driver: SessionDriver,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenancyConfig {
    /// Name of the central database holding users, businesses and tenants.
    pub central_database: String,
    /// Prefix of every permission cache key, followed by the tenant id.
    pub permission_cache_prefix: String,
    /// Seconds a cached permission list stays valid.
    pub permission_cache_ttl_secs: u64,
    /// Seconds between sweeps of expired sessions and cache entries.
    pub sweep_interval_secs: u64,
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
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        // Session overrides
        if let Ok(v) = env::var("SESSION_DRIVER") {
            self.session.driver = match v.as_str() {
                "database" | "db" => SessionDriver::Database,
                "memory" => SessionDriver::Memory,
                _ => self.session.driver,
            };
        }

        // Tenancy overrides
        if let Ok(v) = env::var("TENANCY_CENTRAL_DATABASE") {
            self.tenancy.central_database = v;
        }
        if let Ok(v) = env::var("TENANCY_PERMISSION_CACHE_PREFIX") {
            self.tenancy.permission_cache_prefix = v;
        }
        if let Ok(v) = env::var("TENANCY_PERMISSION_CACHE_TTL") {
            if let Ok(secs) = v.parse() {
                self.tenancy.permission_cache_ttl_secs = secs;
            }
        }
        if let Ok(v) = env::var("SWEEP_INTERVAL") {
            if let Ok(secs) = v.parse() {
                self.tenancy.sweep_interval_secs = secs;
            }
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                jwt_secret: "development-secret-change-me".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
            },
            session: SessionConfig {
                driver: SessionDriver::Memory,
            },
            tenancy: TenancyConfig {
                central_database: "central".to_string(),
                permission_cache_prefix: "permission.cache.tenant.".to_string(),
                permission_cache_ttl_secs: 300,
                sweep_interval_secs: 300,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
            },
            session: SessionConfig {
                driver: SessionDriver::Database,
            },
            tenancy: TenancyConfig {
                central_database: "central".to_string(),
                permission_cache_prefix: "permission.cache.tenant.".to_string(),
                permission_cache_ttl_secs: 300,
                sweep_interval_secs: 300,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
            },
            session: SessionConfig {
                driver: SessionDriver::Database,
            },
            tenancy: TenancyConfig {
                central_database: "central".to_string(),
                permission_cache_prefix: "permission.cache.tenant.".to_string(),
                permission_cache_ttl_secs: 60,
                sweep_interval_secs: 300,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.session.driver, SessionDriver::Memory);
        assert!(!config.security.jwt_secret.is_empty());
        assert_eq!(config.tenancy.central_database, "central");
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.session.driver, SessionDriver::Database);
        // Production refuses to sign tokens until a secret is provided
        assert!(config.security.jwt_secret.is_empty());
        assert_eq!(config.security.jwt_expiry_hours, 4);
        assert_eq!(config.tenancy.permission_cache_ttl_secs, 60);
        assert!(config.tenancy.sweep_interval_secs > 0);
    }
}
