use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Lifetime of presigned image URLs handed to clients.
    pub url_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    /// How many times a write transaction is attempted on transient store errors.
    pub tx_retry_attempts: u32,
    pub max_body_bytes: usize,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "recipebook".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "recipebook-users".into()),
        };
        let storage = StorageConfig {
            endpoint: std::env::var("STORAGE_ENDPOINT").context("STORAGE_ENDPOINT")?,
            bucket: std::env::var("STORAGE_BUCKET").unwrap_or_else(|_| "recipes".into()),
            access_key: std::env::var("STORAGE_ACCESS_KEY").context("STORAGE_ACCESS_KEY")?,
            secret_key: std::env::var("STORAGE_SECRET_KEY").context("STORAGE_SECRET_KEY")?,
            region: std::env::var("STORAGE_REGION").unwrap_or_else(|_| "us-east-1".into()),
            url_ttl_secs: env_or("IMAGE_URL_TTL_SECS", 30 * 60),
        };
        Ok(Self {
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            tx_retry_attempts: env_or("TX_RETRY_ATTEMPTS", 3).max(1),
            max_body_bytes: env_or("MAX_BODY_BYTES", 20 * 1024 * 1024),
            jwt,
            storage,
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_on_missing_or_garbage() {
        std::env::set_var("RECIPEBOOK_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_or::<u32>("RECIPEBOOK_TEST_GARBAGE", 7), 7);
        assert_eq!(env_or::<u32>("RECIPEBOOK_TEST_UNSET_KEY", 3), 3);

        std::env::set_var("RECIPEBOOK_TEST_NUMBER", "42");
        assert_eq!(env_or::<u64>("RECIPEBOOK_TEST_NUMBER", 1), 42);
    }
}
