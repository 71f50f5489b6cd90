use std::fmt;

use anyhow::Context;

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("ttl_minutes", &self.ttl_minutes)
            .finish()
    }
}

/// Argon2 cost parameters. Raising any of them makes every hash slower.
#[derive(Debug, Clone, Copy)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub hashing: HashingConfig,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 7 * 24 * 60;

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .context("DATABASE_URL must be set")?;
        let secret = lookup("JWT_SECRET")
            .filter(|v| !v.is_empty())
            .context("JWT_SECRET must be set")?;

        let parsed_u64 = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        // Out-of-range values fall back to the default.
        let parsed_u32 = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u32>().ok());

        let jwt = JwtConfig {
            secret,
            ttl_minutes: lookup("JWT_TTL_MINUTES")
                .and_then(|v| v.trim().parse::<i64>().ok())
                .filter(|m| *m > 0)
                .unwrap_or(DEFAULT_TOKEN_TTL_MINUTES),
        };

        let defaults = HashingConfig::default();
        let hashing = HashingConfig {
            memory_kib: parsed_u32("ARGON2_MEMORY_KIB").unwrap_or(defaults.memory_kib),
            iterations: parsed_u32("ARGON2_ITERATIONS").unwrap_or(defaults.iterations),
            parallelism: parsed_u32("ARGON2_PARALLELISM").unwrap_or(defaults.parallelism),
        };

        Ok(Self {
            database_url,
            jwt,
            hashing,
            db_max_connections: parsed_u32("DB_MAX_CONNECTIONS").unwrap_or(10),
            db_acquire_timeout_secs: parsed_u64("DB_ACQUIRE_TIMEOUT_SECS").unwrap_or(5),
            request_timeout_secs: parsed_u64("REQUEST_TIMEOUT_SECS").unwrap_or(30),
        })
    }
}
