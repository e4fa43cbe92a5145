//! Wiring from settings to a running server.

use std::future::Future;

use anyhow::Context;
use axum::Router;
use bookstore_db::Database;
use bookstore_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;

/// A fully initialized application: pool open, schema applied, modules initialized.
pub struct Application {
    settings: Settings,
    db: Database,
    registry: ModuleRegistry,
}

impl Application {
    /// Connect to the configured database and initialize every module.
    pub async fn build(settings: Settings) -> anyhow::Result<Self> {
        let db = Database::connect(&settings.database.pool_config())
            .await
            .context("failed to open database pool")?;

        Self::with_database(settings, db).await
    }

    /// Initialize every module against an already open database.
    pub async fn with_database(settings: Settings, db: Database) -> anyhow::Result<Self> {
        let registry = registry(&db);

        apply_schema(&registry, &db).await?;

        let ctx = InitCtx {
            settings: &settings,
            db: &db,
        };
        registry.init_modules(&ctx).await?;

        Ok(Self {
            settings,
            db,
            registry,
        })
    }

    /// Router with every module mounted and global middleware applied.
    pub fn router(&self) -> Router {
        bookstore_http::build_router(&self.registry, &self.settings, &self.db)
    }

    /// Start modules, serve until `shutdown` resolves, then stop modules and
    /// close the pool.
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let ctx = InitCtx {
            settings: &self.settings,
            db: &self.db,
        };
        self.registry.start_modules(&ctx).await?;

        let served = bookstore_http::start_server(self.router(), &self.settings, shutdown).await;

        // Stop modules and release the pool even when serving failed.
        let stopped = self.registry.stop_modules().await;
        self.db.close().await;

        served?;
        stopped
    }
}

/// Registry holding every module of this application.
pub fn registry(db: &Database) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, db);
    registry
}

/// Apply every module's schema scripts, returning how many ran.
pub async fn apply_schema(registry: &ModuleRegistry, db: &Database) -> anyhow::Result<usize> {
    let scripts: Vec<(String, &'static str)> = registry
        .collect_migrations()
        .into_iter()
        .map(|(module, migration)| (format!("{}/{}", module, migration.id), migration.up))
        .collect();

    db.apply_schema(scripts.iter().map(|(id, up)| (id.as_str(), *up)))
        .await
        .context("failed to apply schema")
}

/// Open the database, apply the schema and close the pool again.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let db = Database::connect(&settings.database.pool_config())
        .await
        .context("failed to open database pool")?;

    let applied = apply_schema(&registry(&db), &db).await;
    db.close().await;
    applied
}

/// Serve until Ctrl-C.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    let app = Application::build(settings).await?;
    tracing::info!("bookstore-app bootstrap complete");
    app.run_until(shutdown_signal()).await
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookstore_db::PoolConfig;

    #[tokio::test]
    async fn schema_is_applied_once_per_module_script() {
        let db = Database::connect(&PoolConfig::in_memory()).await.unwrap();
        let registry = registry(&db);

        assert_eq!(apply_schema(&registry, &db).await.unwrap(), 1);
        // Idempotent on an existing table.
        assert_eq!(apply_schema(&registry, &db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn migrate_against_memory_database() {
        let mut settings = Settings::default();
        settings.database.url = "sqlite::memory:".to_string();

        assert_eq!(migrate(&settings).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn application_stops_cleanly_on_immediate_shutdown() {
        let mut settings = Settings::default();
        settings.server.host = "127.0.0.1".to_string();
        settings.server.port = 0;
        let db = Database::connect(&PoolConfig::in_memory()).await.unwrap();

        let app = Application::with_database(settings, db.clone())
            .await
            .unwrap();
        app.run_until(async {}).await.unwrap();

        assert!(db.ping().await.is_err());
    }
}
