//! relaybot - chat-bot middleware
//!
//! Inbound messages from a pluggable backend are dispatched to registered
//! command handlers; replies (and cross-room relays) are routed back out
//! through the same backend.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod plugins;
