//! WebSocket layer: envelope codec, transport, reconnection, and the
//! connection manager that ties them together.
//!
//! The canvas server speaks JSON text frames over a single socket. Only
//! `initial_canvas` and `pixel_update` frames are understood; outbound
//! pixel placements are translated into `pixel_update` frames.

pub mod connection;
pub mod messages;
pub mod reconnect;
pub mod transport;

pub use connection::ConnectionManager;
pub use transport::{Connector, TungsteniteConnector};
