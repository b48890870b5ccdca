//! Minimal bot that logs messages and reports when it is ready.
//!
//! Run with: SCATTER_TOKEN=... cargo run -p scatter --example ping_bot [config.toml]

use std::sync::Arc;

use scatter::{token_from_env, Dispatcher, Event, Gateway, GatewayConfig};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("scatter=info".parse()?))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => GatewayConfig::from_file(path)?,
        None => GatewayConfig::from_env()?,
    };
    let token = token_from_env()?;

    let dispatcher = Arc::new(Dispatcher::new());
    dispatcher.on("ready", |event: Event| async move {
        let user_id = event
            .as_raw()
            .and_then(|payload| payload.get("user_id"))
            .and_then(|id| id.as_str())
            .unwrap_or("unknown")
            .to_string();
        info!(user_id, "bot ready");
        Ok(())
    });
    dispatcher.on("message", |event: Event| async move {
        if let Some(message) = event.as_message() {
            info!(
                channel = %message.channel_id,
                author = message.author.name(),
                content = %message.content,
                "message"
            );
        }
        Ok(())
    });

    let gateway = Arc::new(Gateway::new(token, dispatcher).with_config(config));
    info!(url = %gateway.config().ws_url, "connecting");

    let closer = Arc::clone(&gateway);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down");
            closer.close().await;
        }
    });

    if let Err(e) = gateway.connect().await {
        error!(error = %e, "gateway stopped");
        return Err(e.into());
    }
    Ok(())
}
