//! relay-server: accepts chat connections, runs a session per client and
//! hosts the upload gateway.

pub mod http;
pub mod session;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{ Context, Result };
use relay_core::{Config, Hub, HubHandle, MessageLog};
use tokio::net::TcpListener;
use tracing::{ info, warn };

use crate::session::GatewaySession;
use crate::store::DiskStore;

/// Binds both listeners and serves until Ctrl-C. Any startup failure is fatal.
pub async fn run(config: Config) -> Result<()> {
    println!("Starting relay on {} (uploads on {})", config.listen, config.upload_listen);

    let chat = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Failed to bind chat listener on {}", config.listen))?;
    let uploads = TcpListener::bind(config.upload_listen)
        .await
        .with_context(|| format!("Failed to bind upload listener on {}", config.upload_listen))?;
    let store = DiskStore::open(&config.upload_dir, config.max_upload_bytes, config.max_batch_files)
        .await
        .with_context(|| format!("Failed to create upload dir {}", config.upload_dir.display()))?;

    let hub = Hub::spawn(MessageLog::with_capacity(config.backlog_capacity));

    info!(
        chat = %config.listen,
        uploads = %config.upload_listen,
        upload_dir = %config.upload_dir.display(),
        "relay running"
    );
    println!("Relay running! Waiting for connections...");

    tokio::select! {
        result = serve_chat(chat, hub) => result,
        result = http::serve(uploads, Arc::new(store)) => result,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            info!("shutting down");
            Ok(())
        }
    }
}

/// Accept loop for the chat channel. One task per connection.
pub async fn serve_chat(listener: TcpListener, hub: HubHandle) -> Result<()> {
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "Failed to accept connection");
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        let hub = hub.clone();
        tokio::spawn(async move {
            let mut session = GatewaySession::new(peer, hub);
            if let Err(e) = session.run(socket).await {
                warn!(peer = %peer, error = %e, "session ended with error");
            }
        });
    }
}
