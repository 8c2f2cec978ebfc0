//! rewrite-proxy
//!
//! ```text
//!     Client ──▶ /example.com/page ──▶ resolver ──▶ https://example.com/page
//!                                                         │
//!     Client ◀── stream (non-HTML, WebSocket) ◀───────────┤
//!     Client ◀── decompress → inject script → recompress ◀┘ (text/html)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;

use rewrite_proxy::config::{load_config, ConfigSources};
use rewrite_proxy::lifecycle::{signals, Shutdown};
use rewrite_proxy::observability::{logging, metrics};
use rewrite_proxy::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "rewrite-proxy")]
#[command(about = "Reverse proxy that routes by path and rewrites HTML links", long_about = None)]
struct Args {
    /// Port to listen on.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Default upstream for paths that do not start with a hostname.
    #[arg(long, env = "TARGET_URL")]
    target_url: Option<String>,

    /// Public URL of this proxy; its hostname is embedded in rewritten pages.
    #[arg(long, env = "RENDER_EXTERNAL_URL")]
    external_url: Option<String>,

    /// Optional TOML file with timeouts, limits and observability settings.
    #[arg(long, env = "PROXY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load_config(ConfigSources {
        port: args.port,
        target_url: args.target_url,
        external_url: args.external_url,
        settings_path: args.config,
    }) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("rewrite-proxy: configuration error: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    logging::init(&config.observability);
    tracing::info!(
        listen_port = config.listen_port,
        default_target = %config.default_target_url,
        public_hostname = %config.public_hostname,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validation already checked the address.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let listener = TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Proxy server listening");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown);

    HttpServer::new(config).run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(ExitCode::SUCCESS)
}
