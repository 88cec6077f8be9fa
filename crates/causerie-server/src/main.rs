//! Causerie server binary.
//!
//! Wires the store, cipher, presence registry and room broker together and
//! serves the HTTP + WebSocket API until interrupted.

mod api;
mod config;
mod error;
mod service;
mod ws;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use causerie_realtime::{PresenceRegistry, RoomBroker};
use causerie_shared::MessageCipher;
use causerie_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::service::ConversationService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,causerie_server=debug")),
        )
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(
        instance = %config.instance_name,
        db = %config.db_path.display(),
        "starting causerie server"
    );

    let db = Database::open_at(&config.db_path).context("failed to open database")?;
    let cipher = MessageCipher::new(&config.message_secret);
    let broker = Arc::new(RoomBroker::new());
    let presence = Arc::new(PresenceRegistry::new());
    let service = Arc::new(ConversationService::new(
        db,
        cipher,
        broker.clone(),
        presence.clone(),
    ));

    let state = AppState {
        service,
        broker,
        presence,
    };

    tokio::select! {
        result = api::serve(config.http_addr, state) => {
            result.context("http server exited")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}
