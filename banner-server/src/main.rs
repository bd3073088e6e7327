use banner_server::{app, config, logging};
use clap::Parser;
use std::process::ExitCode;
use tokio::net::TcpListener;

#[derive(Parser, Debug)]
#[command(author, version, about = "Banner-serving HTTP service")]
struct Opts {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "config.yaml")]
    config: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let opts = Opts::parse();

    let config = match config::load(&opts.config) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("failed to load configuration from {}: {error}", opts.config);
            return ExitCode::FAILURE;
        }
    };

    let _logging_guard = match logging::init(&config.logger) {
        Ok(guard) => guard,
        Err(error) => {
            eprintln!("failed to initialize logging: {error}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(mode = ?config.mode, port = config.port, "starting banner-server");

    let app = match app::build(&config).await {
        Ok(app) => app,
        Err(error) => {
            tracing::error!(error = %error, "failed to initialize application");
            return ExitCode::FAILURE;
        }
    };

    let listener = match TcpListener::bind(("0.0.0.0", config.port)).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(error = %error, "failed to bind listener");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(addr = %listener.local_addr().expect("bound listener has a local address"), "listening");

    let result = axum::serve(listener, app.router).with_graceful_shutdown(app::shutdown_signal()).await;

    app.sweeper.shutdown();
    app.pool.close().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %error, "server error");
            ExitCode::FAILURE
        }
    }
}
