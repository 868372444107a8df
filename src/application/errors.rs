//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Room error: {0}")]
    Room(#[from] RoomError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while parsing a participant address
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("malformed address '{0}': missing '@'")]
    MalformedAddress(String),

    #[error("malformed address '{0}': empty node or domain")]
    EmptyPart(String),
}

/// Errors raised inside a single dispatch cycle.
///
/// All of these become a user-visible reply and end the cycle cleanly;
/// none of them terminate the process.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Invalid arguments: {0}")]
    ArgumentSyntax(#[from] ArgumentSyntaxError),

    #[error("Access denied")]
    AccessDenied,

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// Argument tokenization failure (shell-style parsing only)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentSyntaxError {
    #[error("unbalanced quote in arguments")]
    UnbalancedQuote,

    #[error("dangling escape at end of arguments")]
    DanglingEscape,
}

/// Failure raised inside a command handler, including partway through a
/// lazily produced response sequence.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl From<RoomError> for HandlerError {
    fn from(e: RoomError) -> Self {
        Self(e.to_string())
    }
}

impl From<DeliveryError> for HandlerError {
    fn from(e: DeliveryError) -> Self {
        Self(e.to_string())
    }
}

/// Outbound send failure. Logged, never fatal to the pipeline.
#[derive(Error, Debug, Clone)]
#[error("delivery to {target} failed: {reason}")]
pub struct DeliveryError {
    pub target: String,
    pub reason: String,
}

impl DeliveryError {
    pub fn new(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// Room operation errors
#[derive(Error, Debug, Clone)]
pub enum RoomError {
    #[error("could not join room {0}: {1}")]
    Join(String, String),

    #[error("not in room {0}")]
    NotJoined(String),

    #[error("already in room {0}")]
    AlreadyJoined(String),

    #[error("room operation on {0} failed: {1}")]
    Operation(String, String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
