//! Wires the banner service, cache, and sweeper into an `axum::Router`, and
//! drives the process's graceful shutdown.

use crate::auth::{PrefixTokenValidator, TokenValidator};
use crate::config::Config;
use crate::{handlers, logging, metrics};
use axum::routing::{delete, get, patch, post};
use axum::{middleware, Router};
use banner_cache::RedisCache;
use banner_service::BannerService;
use banner_sql::PgStore;
use banner_sweeper::Sweeper;
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Failure to initialize a dependency (Postgres pool, migrations, Redis connection).
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("postgres connection failed: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("redis connection failed: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Shared state reachable from every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BannerService>,
    pub sweeper: Arc<Sweeper>,
    pub token_validator: Arc<dyn TokenValidator>,
}

pub struct App {
    pub router: Router,
    pub sweeper: Arc<Sweeper>,
    pub pool: sqlx::PgPool,
}

/// Builds the full application: connects to Postgres and Redis, runs
/// migrations, starts the sweeper, and assembles the route table.
pub async fn build(config: &Config) -> Result<App, InitError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.postgres.max_connections)
        .min_connections(config.postgres.min_connections)
        .idle_timeout(Duration::from_secs(config.postgres.ttl_idle_connections))
        .connect(&config.postgres.url)
        .await?;

    banner_sql::run_migrations(&pool).await?;

    let store = Arc::new(PgStore::new(pool.clone()));
    let cache = Arc::new(RedisCache::connect(&config.redis.url).await?);
    let service = Arc::new(BannerService::new(store.clone(), cache));

    let sweeper = Arc::new(Sweeper::new(store));
    sweeper.start();

    let prometheus_handle = metrics::install();

    let state = AppState {
        service,
        sweeper: sweeper.clone(),
        token_validator: Arc::new(PrefixTokenValidator),
    };

    let router = router(state, prometheus_handle);

    Ok(App { router, sweeper, pool })
}

#[derive(OpenApi)]
#[openapi(paths(
    handlers::create_banner,
    handlers::get_banners,
    handlers::update_banner,
    handlers::delete_banner,
    handlers::delete_filtered_banner,
    handlers::get_user_banner,
    handlers::get_admin_token,
    handlers::get_user_token,
))]
struct ApiDoc;

/// Assembles the route table over an already-constructed [`AppState`]. Split
/// out from [`build`] so tests can wire a router over in-memory fakes without
/// a live Postgres/Redis connection.
pub fn router(state: AppState, prometheus_handle: PrometheusHandle) -> Router {
    let admin_routes = Router::new()
        .route("/banner", post(handlers::create_banner).get(handlers::get_banners))
        .route("/banner/{id}", patch(handlers::update_banner).delete(handlers::delete_banner))
        .route("/filter_banner", delete(handlers::delete_filtered_banner))
        .route_layer(middleware::from_fn_with_state(state.clone(), crate::auth::require_admin));

    let user_routes = Router::new()
        .route("/user_banner", get(handlers::get_user_banner))
        .route_layer(middleware::from_fn_with_state(state.clone(), crate::auth::require_user));

    let token_routes = Router::new()
        .route("/token/admin", get(handlers::get_admin_token))
        .route("/token/user", get(handlers::get_user_token));

    let api = Router::new()
        .merge(admin_routes)
        .merge(user_routes)
        .merge(token_routes)
        .with_state(state);

    Router::new()
        .nest("/api/v1", api)
        .route("/metrics", get(metrics::handler).with_state(prometheus_handle))
        .merge(SwaggerUi::new("/swagger").url("/swagger/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(metrics::record))
        .layer(middleware::from_fn(logging::request_logging))
        .layer(CatchPanicLayer::new())
}

/// Resolves when a `Ctrl+C` or (on unix) `SIGTERM` is received.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
