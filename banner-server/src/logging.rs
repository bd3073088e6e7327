//! `tracing` initialization: a stderr layer always on, plus an optional rolling
//! file layer, and a per-request logging middleware that attaches a request-id
//! span to every log line emitted while handling the request.

use crate::config::LoggerConfig;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use std::io;
use std::str::FromStr as _;
use std::time::Instant;
use tracing::level_filters::LevelFilter;
use tracing::Instrument as _;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::EnvFilter;

/// Failed to parse `logger.level`, or the subscriber was already installed.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log level {0:?}")]
    InvalidLevel(String),

    #[error("a tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Initializes the global `tracing` subscriber per `logger`. Returns a guard
/// that must be held for the process lifetime when file logging is enabled, so
/// the background writer thread is not dropped prematurely.
pub fn init(logger: &LoggerConfig) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, LoggingError> {
    let mut default_level =
        LevelFilter::from_str(&logger.level).map_err(|_| LoggingError::InvalidLevel(logger.level.clone()))?;

    // `allow_show_low_level` lets an operator pin the level below INFO even when
    // the configured level would otherwise be coarser; without it, DEBUG/TRACE
    // never surface regardless of `logger.level`.
    if !logger.allow_show_low_level && default_level > LevelFilter::INFO {
        default_level = LevelFilter::INFO;
    }

    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt().with_env_filter(env_filter).with_writer(io::stderr);

    if logger.use_std_and_file {
        let file_appender = tracing_appender::rolling::daily(&logger.directory, &logger.app_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        subscriber
            .finish()
            .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
            .try_init()
            .map_err(|_| LoggingError::AlreadyInitialized)?;

        Ok(Some(guard))
    } else {
        subscriber.try_init().map_err(|_| LoggingError::AlreadyInitialized)?;

        Ok(None)
    }
}

/// Logs method/path/status/latency for every request, under a span carrying a
/// generated request id so every log line emitted while handling it can be
/// correlated.
pub async fn request_logging(request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let span = tracing::info_span!("request", %request_id, %method, %path);

    async move {
        let start = Instant::now();
        tracing::info!("request started");

        let response = next.run(request).await;

        let latency = start.elapsed();
        tracing::info!(status = response.status().as_u16(), latency_ms = latency.as_millis() as u64, "request completed");

        response
    }
    .instrument(span)
    .await
}
