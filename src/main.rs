use std::path::PathBuf;

use clap::Parser;
use tokio::signal;

use cordlink::config::{self, Config};
use cordlink::gateway::{intents, GatewayConnection};
use cordlink::handlers;

#[derive(Parser)]
#[command(name = "cordlink", version, about = "Gateway client that keeps a bot session alive")]
struct Cli {
    /// Load environment variables from this file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Override DISCORD_GATEWAY_URL
    #[arg(long)]
    gateway_url: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cordlink=debug".into()),
        )
        .init();

    if let Err(e) = config::load_env_file(cli.env_file.as_deref()) {
        eprintln!("  \x1b[31m✗ {e}\x1b[0m");
        std::process::exit(1);
    }

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("  \x1b[31m✗ {e}\x1b[0m");
            std::process::exit(1);
        }
    };
    if let Some(url) = cli.gateway_url {
        config.gateway.url = url;
    }

    print_banner(&config);

    let gateway = GatewayConnection::new(config.gateway, config.credentials);
    if let Err(e) = run(&gateway).await {
        tracing::error!("gateway client stopped: {e}");
        std::process::exit(1);
    }
}

async fn run(gateway: &GatewayConnection) -> Result<(), cordlink::error::GatewayError> {
    gateway.on_event(handlers::MESSAGE_REACTION_ADD, handlers::log_reaction)?;
    gateway.connect()?;

    shutdown_signal().await;
    tracing::info!("shutdown requested");
    gateway.close().await
}

fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");
    let git_sha = env!("GIT_SHA");
    let intent_names = intents::names(config.credentials.intents()).join(", ");

    eprintln!();
    eprintln!("  \x1b[1;36mcordlink\x1b[0m \x1b[2mv{version} ({git_sha})\x1b[0m");
    eprintln!();
    eprintln!("  \x1b[2mgateway\x1b[0m      {} (v{})", config.gateway.url, config.gateway.api_version);
    eprintln!("  \x1b[2mtoken\x1b[0m        {}", config.credentials.redacted_token());
    eprintln!(
        "  \x1b[2mintents\x1b[0m      {} ({intent_names})",
        config.credentials.intents()
    );
    eprintln!("  \x1b[2mreconnect\x1b[0m    {:?}", config.gateway.reconnect_delay);

    if config.credentials.intents() & intents::PRIVILEGED_INTENTS != 0 {
        eprintln!();
        eprintln!("  \x1b[33m! privileged intents requested, enable them for the application\x1b[0m");
    }

    eprintln!();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
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
}
