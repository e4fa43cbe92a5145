//! SQLite connection pool factory and schema bootstrap.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub mod error;

pub use error::{DbError, DbResult};

/// Pool parameters, usually built from the `database` settings section.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl PoolConfig {
    /// A private in-memory database, handy for tests.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }

    fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

/// Shared handle to the connection pool. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the pool described by `config`, creating the database file if missing.
    pub async fn connect(config: &PoolConfig) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .with_context(|| format!("invalid database url '{}'", config.url))?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new().acquire_timeout(config.acquire_timeout);

        // Every connection to `:memory:` opens its own database, so keep exactly one alive.
        pool_options = if config.is_in_memory() {
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(config.max_connections)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("failed to connect to '{}'", config.url))?;

        tracing::info!(
            target: "bookstore-db",
            url = %config.url,
            max_connections = config.max_connections,
            "database pool ready"
        );

        Ok(Self { pool })
    }

    /// Underlying pool for running queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Round-trip a trivial statement to confirm the database answers.
    pub async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Run idempotent schema scripts in the order given.
    ///
    /// Scripts are expected to use `IF NOT EXISTS` forms; nothing is recorded
    /// about which scripts have run.
    pub async fn apply_schema<'a, I>(&self, scripts: I) -> anyhow::Result<usize>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut applied = 0;

        for (id, sql) in scripts {
            tracing::debug!(target: "bookstore-db", script = id, "applying schema script");

            sqlx::raw_sql(sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("schema script '{}' failed", id))?;

            applied += 1;
        }

        tracing::info!(target: "bookstore-db", applied, "schema up to date");
        Ok(applied)
    }

    /// Close every connection in the pool. Further queries fail with `PoolClosed`.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!(target: "bookstore-db", "database pool closed");
    }
}
