//! pixel-link command-line client.
//!
//! Connects to the canvas server, logs every canvas event, and places the
//! pixels typed on stdin as `x y color` lines.

use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use pixel_link::config::ClientConfig;
use pixel_link::domain::{ClientEvent, EventKind, PixelPlacement, listener};
use pixel_link::ws::ConnectionManager;

/// Grace period for the closing handshake before the process exits.
const CLOSE_GRACE: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ClientConfig::from_env().context("loading configuration")?;
    tracing::info!(
        url = %config.url,
        max_reconnect_attempts = config.max_reconnect_attempts,
        "starting pixel-link"
    );

    let client = ConnectionManager::new(config);
    client.on(EventKind::InitialCanvas, listener(log_event));
    client.on(EventKind::PixelUpdate, listener(log_event));
    client.on(EventKind::ReconnectFailed, listener(log_event));
    client.connect_default();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line.context("reading stdin")? {
                Some(line) => place_from_line(&client, &line),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    client.close();
    tokio::time::sleep(CLOSE_GRACE).await;
    tracing::info!("pixel-link stopped");
    Ok(())
}

/// Installs the tracing subscriber. `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn log_event(event: &ClientEvent) {
    match event {
        ClientEvent::InitialCanvas(snapshot) => {
            tracing::info!(size = snapshot.to_string().len(), "received canvas snapshot");
        }
        ClientEvent::PixelUpdate(p) => {
            tracing::info!(x = p.x, y = p.y, color = %p.color, "pixel updated");
        }
        ClientEvent::ReconnectFailed { attempts } => {
            tracing::error!(attempts, "gave up reconnecting; restart to try again");
        }
        _ => {}
    }
}

fn place_from_line(client: &ConnectionManager, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    let Some(placement) = parse_placement(line) else {
        tracing::warn!(%line, "expected `x y color`");
        return;
    };
    match client.place_pixel(&placement) {
        Ok(()) => {}
        Err(e) if e.is_transient() => tracing::warn!(error = %e, "pixel not placed; try again"),
        Err(e) => tracing::error!(error = %e, "pixel rejected"),
    }
}

/// Parses `x y color`, e.g. `12 40 #ff0000`.
fn parse_placement(line: &str) -> Option<PixelPlacement> {
    let mut parts = line.split_whitespace();
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    let color = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some(PixelPlacement::new(x, y, color))
}
