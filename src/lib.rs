//! # pixel-link
//!
//! Reconnecting WebSocket client for a collaborative pixel canvas.
//!
//! The crate opens one WebSocket to the canvas server, decodes its small
//! JSON protocol into typed events, serializes pixel placements, and
//! retries a dropped connection a bounded number of times.
//!
//! ## Architecture
//!
//! ```text
//! Renderer / UI
//!     │  on(kind, listener)      send / place_pixel
//!     ▼                          │
//! ConnectionManager (ws/) ◄──────┘
//!     ├── ListenerRegistry (domain/)
//!     ├── envelope codec (ws/messages)
//!     ├── ReconnectBudget (ws/reconnect)
//!     │
//!     └── Connector ─► tokio-tungstenite socket task
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use pixel_link::config::ClientConfig;
//! use pixel_link::domain::{ClientEvent, EventKind, PixelPlacement, listener};
//! use pixel_link::ws::ConnectionManager;
//!
//! # async fn example() -> Result<(), pixel_link::error::ClientError> {
//! let client = ConnectionManager::new(ClientConfig::from_env()?);
//! client.on(
//!     EventKind::PixelUpdate,
//!     listener(|event| {
//!         if let ClientEvent::PixelUpdate(p) = event {
//!             println!("({}, {}) -> {}", p.x, p.y, p.color);
//!         }
//!     }),
//! );
//! client.on(
//!     EventKind::Open,
//!     listener({
//!         let client = client.clone();
//!         move |_| {
//!             let _ = client.place_pixel(&PixelPlacement::new(1, 2, "#000"));
//!         }
//!     }),
//! );
//! client.connect_default();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod ws;
