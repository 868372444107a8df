//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Errors: the error taxonomy of the whole pipeline
//! - Messaging: argument parsing, dispatching, chunking, templating
//! - Relay: cross-room message relaying and presence keep-alive
//! - Services: the bot core tying everything to a backend

pub mod errors;
pub mod messaging;
pub mod relay;
pub mod services;
