use anyhow::Context;
use clap::Parser;
use relay_core::logging::init_logging;
use relay_core::RelayConfig;

#[derive(Parser, Debug)]
#[command(name = "relay-server")]
#[command(about = "Streams LLM chat replies with bounded per-session memory")]
struct Args {
    /// Address to bind; overrides RELAY_HOST.
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on; overrides RELAY_PORT.
    #[arg(short, long)]
    port: Option<u16>,

    /// Bundled frontend directory; overrides RELAY_STATIC_DIR.
    #[arg(long)]
    static_dir: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let mut config = RelayConfig::from_env()?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(dir) = args.static_dir {
        config.server.static_dir = dir;
    }

    init_logging(&config.logging);

    let app = relay_server::app(&config)?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, model = %config.provider.model, "chat relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
