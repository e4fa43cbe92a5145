//! HTTP server facade with Axum, error handling, and OpenAPI support.

use std::future::Future;

use anyhow::Context;
use axum::{
    extract::{Request, State},
    http::HeaderValue,
    routing::get,
    Router,
};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::{Timestamp, Uuid};

use bookstore_db::Database;
use bookstore_kernel::{settings::Settings, ModuleRegistry};

pub mod error;
pub mod extract;
pub mod router;

use error::AppError;
use router::RouterBuilder;

/// Bind to the configured address and serve `app` until `shutdown` resolves.
pub async fn start_server<F>(app: Router, settings: &Settings, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", settings.server.host, settings.server.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Build the main HTTP router with all module routes mounted
pub fn build_router(registry: &ModuleRegistry, settings: &Settings, db: &Database) -> Router {
    let mut router_builder = RouterBuilder::new()
        .with_tracing()
        .with_cors()
        .with_request_id()
        .with_timeout(settings.server.request_timeout_ms)
        .route("/healthz", get(health_check).with_state(db.clone()));

    for module in registry.modules() {
        let mount_path = settings.server.mount_path(module.name());

        tracing::info!(
            module = module.name(),
            "mounting module routes under {}",
            mount_path
        );
        router_builder = router_builder.mount_module(&mount_path, module.routes());
    }

    router_builder
        .with_openapi(registry, &settings.server)
        .build()
}

/// Health check endpoint, reports whether the database answers
async fn health_check(State(db): State<Database>) -> Result<&'static str, AppError> {
    db.ping().await.map_err(|err| {
        tracing::warn!(error = %err, "health check failed");
        AppError::unavailable("database is not reachable")
    })?;
    Ok("ok")
}

/// Request ID generator producing time-ordered UUIDs
#[derive(Clone, Copy, Debug, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let timestamp = Timestamp::now(uuid::NoContext);
        let request_id = Uuid::new_v7(timestamp)
            .to_string()
            .parse::<HeaderValue>()
            .ok()?;
        Some(RequestId::new(request_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode};
    use bookstore_db::PoolConfig;
    use tower::ServiceExt;

    fn healthz() -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .uri("/healthz")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn healthz_reports_database_state() {
        let db = Database::connect(&PoolConfig::in_memory()).await.unwrap();
        let router = build_router(&ModuleRegistry::new(), &Settings::default(), &db);

        let response = router.clone().oneshot(healthz()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        db.close().await;
        let response = router.oneshot(healthz()).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let db = Database::connect(&PoolConfig::in_memory()).await.unwrap();
        let router = build_router(&ModuleRegistry::new(), &Settings::default(), &db);

        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .uri("/docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
