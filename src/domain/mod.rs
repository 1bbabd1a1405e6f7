//! Domain layer: pixel payloads, local events, and listener bookkeeping.
//!
//! These types are transport-agnostic. The `ws` layer decodes frames into
//! them and publishes them through a [`ListenerRegistry`].

pub mod client_event;
pub mod listener_registry;
pub mod pixel;

pub use client_event::{
    ABNORMAL_CLOSURE, ClientEvent, CloseEvent, ErrorEvent, EventKind, OpenEvent,
};
pub use listener_registry::{Listener, ListenerRegistry, listener};
pub use pixel::{PixelPlacement, PixelUpdate};
