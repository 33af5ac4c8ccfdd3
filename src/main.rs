use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use question_relay::config::{self, Cli, Config, LogFormat};
use question_relay::provider::openai::OpenAiProvider;
use question_relay::server::api::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Load .env before anything reads the environment.
    let dotenv_path = dotenvy::dotenv().ok();

    init_tracing(&cli);

    info!("question-relay v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = dotenv_path {
        debug!(path = %path.display(), "Loaded environment file");
    }

    // Load configuration.
    let mut config = Config::load(&cli.config)?;
    config.apply_env();
    config.apply_cli(&cli);
    let config = Arc::new(config);

    info!(
        api_base = %config.provider.api_base,
        model = %config.provider.model,
        timeout_secs = config.provider.timeout_secs,
        allowed_origin = config.server.allowed_origin.as_deref().unwrap_or("*"),
        "Configuration loaded"
    );

    // The credential is read exactly once; only its presence is logged.
    let api_key = config::api_key_from_env();
    info!(api_key_present = api_key.is_some(), "Provider credential");
    config::check_credential(&config.provider, api_key.as_ref())?;

    let provider = Arc::new(OpenAiProvider::new(&config.provider, api_key)?);
    let state = Arc::new(AppState::new(config.clone(), provider)?);
    let app = build_router(state)?;

    // Start the server.
    let listen_addr = &config.server.listen;
    let listener = TcpListener::bind(listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn init_tracing(cli: &Cli) {
    let filter = if cli.verbose {
        "question_relay=debug,tower_http=debug"
    } else {
        "question_relay=info,tower_http=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter.into());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    match cli.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
