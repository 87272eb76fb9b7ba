//! Configuration management for the discount code service

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

const DEV_JWT_SECRET: &str = "discount_code_ws_dev_jwt_secret_change_me";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub discounts: DiscountConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
    pub max_lifetime_seconds: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountConfig {
    pub store_backend: StoreBackend,
    pub max_issue_attempts: u32,
    /// JSON users/products file seeding the in-memory catalog
    pub catalog_fixture: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: String,
    pub port: u16,
}

/// Where issued codes are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(StoreBackend::Postgres),
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow::anyhow!("unknown STORE_BACKEND '{}'", other)),
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let environment = var_or("ENVIRONMENT", "development");

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if environment == "production" => {
                return Err(anyhow::anyhow!("JWT_SECRET must be set in production"));
            }
            _ => {
                tracing::warn!("JWT_SECRET not set, using development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let max_issue_attempts: u32 = var_or("DISCOUNT_CODE_MAX_ATTEMPTS", "10").parse()?;
        if max_issue_attempts == 0 {
            return Err(anyhow::anyhow!("DISCOUNT_CODE_MAX_ATTEMPTS must be at least 1"));
        }

        Ok(Config {
            database: DatabaseConfig {
                url: var_or("DATABASE_URL", "postgresql://localhost:5432/discounts"),
                max_connections: var_or("DATABASE_MAX_CONNECTIONS", "20").parse()?,
                min_connections: var_or("DATABASE_MIN_CONNECTIONS", "2").parse()?,
                acquire_timeout_seconds: var_or("DATABASE_ACQUIRE_TIMEOUT_SECONDS", "5").parse()?,
                idle_timeout_seconds: var_or("DATABASE_IDLE_TIMEOUT_SECONDS", "300").parse()?,
                max_lifetime_seconds: var_or("DATABASE_MAX_LIFETIME_SECONDS", "1800").parse()?,
                run_migrations: var_or("DATABASE_RUN_MIGRATIONS", "true").parse()?,
            },
            auth: AuthConfig { jwt_secret },
            discounts: DiscountConfig {
                store_backend: var_or("STORE_BACKEND", "postgres").parse()?,
                max_issue_attempts,
                catalog_fixture: env::var("CATALOG_FIXTURE").ok().filter(|p| !p.is_empty()),
            },
            app: AppConfig {
                environment,
                port: var_or("PORT", "8000").parse()?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_store_backend_names() {
        assert_eq!("postgres".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert_eq!("PG".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert_eq!(" memory ".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("redis".parse::<StoreBackend>().is_err());
    }
}
