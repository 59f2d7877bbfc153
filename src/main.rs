use clap::{Parser, Subcommand};

use mcpflow::config::Config;
use mcpflow::relay::{router, RelayState};
use mcpflow::telemetry::init_telemetry;

#[derive(Parser)]
#[command(name = "mcpflow")]
#[command(about = "Workflow composition and execution engine for MCP tooling", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the same-origin relay server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Upstream origin to relay to (overrides config)
        #[arg(long)]
        upstream: Option<String>,
    },
}

#[tokio::main]
async fn main() -> mcpflow::Result<()> {
    init_telemetry();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve {
            port,
            host,
            upstream,
        } => {
            let mut config = Config::load();
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(upstream) = upstream {
                config.upstream.origin = upstream;
            }
            serve(config).await
        }
    }
}

async fn serve(config: Config) -> mcpflow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = RelayState::new(&config);
    let app = router(state);

    tracing::info!(
        "Relay listening on {} (upstream: {})",
        addr,
        config.upstream.origin
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
