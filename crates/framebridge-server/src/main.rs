use clap::Parser;
use framebridge_server::{BridgeError, BridgeServer, DEFAULT_PORT, ServerConfig};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use tracing::info;

/// Local server that saves FrameBridge exports to disk.
#[derive(Debug, Parser)]
#[command(name = "framebridge-server", version, about)]
struct Cli {
    /// Address to listen on.
    #[arg(short, long, env = "FRAMEBRIDGE_BIND", default_value_t = SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)))]
    bind: SocketAddr,

    /// Base directory for every write.
    #[arg(long, env = "FRAMEBRIDGE_ROOT", default_value = ".")]
    root: PathBuf,

    /// Image directory, relative to the root.
    #[arg(long, default_value = "images")]
    images_dir: PathBuf,

    /// Design data directory, relative to the root.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Name of the design data file.
    #[arg(long, default_value = "design-data.json")]
    design_file: String,
}

impl Cli {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            bind: self.bind,
            root: self.root,
            images_dir: self.images_dir,
            data_dir: self.data_dir,
            design_file: self.design_file,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), BridgeError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "framebridge_server=info,tower_http=info".into()),
        )
        .init();

    let config = Cli::parse().into_config();
    let mut running = BridgeServer::new(config)?.start().await?;

    tokio::select! {
        result = running.finished() => return result,
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C"),
    }

    running.stop().await
}
