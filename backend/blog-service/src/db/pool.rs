//! PostgreSQL pool and schema migrations

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info};

/// Pool sizing and timeouts
#[derive(Clone)]
pub struct DbConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Budget for the `SELECT 1` check after connecting
    pub verify_timeout: Duration,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

// The URL carries credentials
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("database_url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish_non_exhaustive()
    }
}

impl DbConfig {
    pub fn new(database_url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections,
            min_connections: max_connections.min(2),
            verify_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }

    pub fn log_config(&self) {
        info!(
            max_connections = self.max_connections,
            min_connections = self.min_connections,
            acquire_timeout_secs = self.acquire_timeout.as_secs(),
            idle_timeout_secs = self.idle_timeout.as_secs(),
            "blog database pool"
        );
    }
}

/// Connect and make one round trip before handing the pool out
pub async fn create_pool(config: &DbConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .max_lifetime(config.max_lifetime)
        .connect(&config.database_url)
        .await?;

    let ping = sqlx::query("SELECT 1").execute(&pool);
    match tokio::time::timeout(config.verify_timeout, ping).await {
        Ok(Ok(_)) => {
            debug!("database pool verified");
            Ok(pool)
        }
        Ok(Err(e)) => {
            error!(error = %e, "database ping failed");
            Err(e)
        }
        Err(_) => {
            error!(
                timeout_secs = config.verify_timeout.as_secs(),
                "database ping timed out"
            );
            Err(sqlx::Error::PoolTimedOut)
        }
    }
}

/// Apply `migrations/` embedded at build time
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("blog schema is up to date");
    Ok(())
}
