//! Utility modules

pub mod net;

pub use net::{bind_tcp_listener, bind_tcp_listeners, resolve_bind_addresses};
