use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use relay_core::Config;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Group chat relay server")]
struct Cli {
    /// TOML config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, env = "RELAY_LISTEN")]
    listen: Option<SocketAddr>,

    #[arg(long, env = "RELAY_UPLOAD_LISTEN")]
    upload_listen: Option<SocketAddr>,

    #[arg(long, env = "RELAY_UPLOAD_DIR")]
    upload_dir: Option<PathBuf>,

    #[arg(long)]
    max_upload_bytes: Option<usize>,

    /// Files accepted by one multi-file upload
    #[arg(long)]
    max_batch_files: Option<usize>,

    /// Keep only the newest N messages
    #[arg(long)]
    backlog_capacity: Option<usize>,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path).context("Failed to load config")?,
            None => Config::default(),
        };
        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if let Some(upload_listen) = self.upload_listen {
            config.upload_listen = upload_listen;
        }
        if let Some(upload_dir) = self.upload_dir {
            config.upload_dir = upload_dir;
        }
        if let Some(max) = self.max_upload_bytes {
            config.max_upload_bytes = max;
        }
        if let Some(max) = self.max_batch_files {
            config.max_batch_files = max;
        }
        if self.backlog_capacity.is_some() {
            config.backlog_capacity = self.backlog_capacity;
        }
        Ok(config)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = Cli::parse().into_config()?;
    relay_server::run(config).await
}
