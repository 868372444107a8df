use std::sync::Arc;

use async_trait::async_trait;

use crate::application::errors::{BotError, DeliveryError, RoomError};
use crate::domain::entities::{Identifier, Message, RoomHandle, RoomId};

/// Receiver side of the backend contract: the core implements this and the
/// backend invokes it once per session start and once per inbound stanza.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Fired once per successful connection.
    async fn callback_connect(&self);

    /// Fired for every inbound message, in arrival order.
    async fn callback_message(&self, message: Message);
}

/// Backend trait - abstraction for messaging protocol adapters.
///
/// The core only requires this narrow contract; stanza parsing, API calls
/// and authentication live behind it.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name used in logs ("console", "harness", ...)
    fn name(&self) -> &str;

    /// Connect and run the inbound event loop until the session ends,
    /// delivering connect/message callbacks to `handler`.
    async fn serve(&self, handler: Arc<dyn EventHandler>) -> Result<(), BotError>;

    /// Deliver an outbound message. Must not stall the caller beyond
    /// queueing; protocol-level rate limiting is the adapter's concern.
    async fn send(&self, message: Message) -> Result<(), DeliveryError>;

    async fn join_room(
        &self,
        room: &RoomId,
        username: &str,
        password: Option<&str>,
    ) -> Result<RoomHandle, RoomError>;

    async fn leave_room(&self, room: &RoomId) -> Result<(), RoomError>;

    async fn create_room(&self, room: &RoomId) -> Result<(), RoomError>;

    async fn destroy_room(&self, room: &RoomId) -> Result<(), RoomError>;

    async fn invite(&self, room: &RoomId, invitees: &[Identifier]) -> Result<(), RoomError>;

    async fn occupants(&self, room: &RoomId) -> Result<Vec<Identifier>, RoomError>;

    async fn topic(&self, room: &RoomId) -> Result<Option<String>, RoomError>;

    async fn set_topic(&self, room: &RoomId, topic: &str) -> Result<(), RoomError>;

    /// Inert keep-alive signal (an empty presence on XMPP, a ping
    /// elsewhere). Backends without a notion of presence keep the default
    /// no-op.
    async fn heartbeat(&self) -> Result<(), DeliveryError> {
        Ok(())
    }
}
