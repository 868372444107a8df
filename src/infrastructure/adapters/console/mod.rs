//! Console adapter for development/testing
//!
//! Reads commands from stdin as the local user and prints everything the
//! bot sends. Rooms are simulated in-memory so the room commands and the
//! relay can be exercised without a server.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::application::errors::{BotError, DeliveryError, RoomError};
use crate::domain::entities::{Identifier, Message, MessageKind, RoomHandle, RoomId};
use crate::domain::traits::{Backend, EventHandler};

#[derive(Default)]
struct ConsoleRoom {
    occupants: Vec<Identifier>,
    topic: Option<String>,
}

/// Console bot adapter for local development
pub struct ConsoleAdapter {
    bot_identity: Identifier,
    user: Identifier,
    rooms: Mutex<HashMap<RoomId, ConsoleRoom>>,
}

impl ConsoleAdapter {
    pub fn new(bot_identity: Identifier) -> Self {
        Self {
            bot_identity,
            user: Identifier::new("user", "localhost").with_resource("console"),
            rooms: Mutex::new(HashMap::new()),
        }
    }

    fn rooms(&self) -> std::sync::MutexGuard<'_, HashMap<RoomId, ConsoleRoom>> {
        self.rooms.lock().expect("console rooms lock poisoned")
    }
}

#[async_trait]
impl Backend for ConsoleAdapter {
    fn name(&self) -> &str {
        "console"
    }

    async fn serve(&self, handler: Arc<dyn EventHandler>) -> Result<(), BotError> {
        info!("Starting console backend (dev mode), ^D to quit");
        handler.callback_connect().await;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!(">>> ");
            std::io::stdout()
                .flush()
                .map_err(|e| BotError::Internal(e.to_string()))?;

            let line = lines
                .next_line()
                .await
                .map_err(|e| BotError::Internal(e.to_string()))?;
            let Some(line) = line else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            let message = Message::new(self.user.clone(), self.bot_identity.clone(), line);
            handler.callback_message(message).await;
        }
        info!("console backend shutting down");
        Ok(())
    }

    async fn send(&self, message: Message) -> Result<(), DeliveryError> {
        match message.kind {
            MessageKind::Direct => println!("[BOT] {}", message.body),
            MessageKind::Broadcast => println!("[BOT in {}] {}", message.to, message.body),
        }
        Ok(())
    }

    async fn join_room(
        &self,
        room: &RoomId,
        username: &str,
        _password: Option<&str>,
    ) -> Result<RoomHandle, RoomError> {
        let mut rooms = self.rooms();
        let entry = rooms.entry(room.clone()).or_default();
        entry
            .occupants
            .push(self.bot_identity.to_bare().with_resource(username));
        Ok(RoomHandle::new(room.clone()))
    }

    async fn leave_room(&self, room: &RoomId) -> Result<(), RoomError> {
        self.rooms()
            .remove(room)
            .map(|_| ())
            .ok_or_else(|| RoomError::NotJoined(room.to_string()))
    }

    async fn create_room(&self, room: &RoomId) -> Result<(), RoomError> {
        self.rooms().entry(room.clone()).or_default();
        Ok(())
    }

    async fn destroy_room(&self, room: &RoomId) -> Result<(), RoomError> {
        self.rooms().remove(room);
        Ok(())
    }

    async fn invite(&self, room: &RoomId, invitees: &[Identifier]) -> Result<(), RoomError> {
        let mut rooms = self.rooms();
        let entry = rooms
            .get_mut(room)
            .ok_or_else(|| RoomError::NotJoined(room.to_string()))?;
        entry.occupants.extend(invitees.iter().cloned());
        Ok(())
    }

    async fn occupants(&self, room: &RoomId) -> Result<Vec<Identifier>, RoomError> {
        self.rooms()
            .get(room)
            .map(|r| r.occupants.clone())
            .ok_or_else(|| RoomError::NotJoined(room.to_string()))
    }

    async fn topic(&self, room: &RoomId) -> Result<Option<String>, RoomError> {
        self.rooms()
            .get(room)
            .map(|r| r.topic.clone())
            .ok_or_else(|| RoomError::NotJoined(room.to_string()))
    }

    async fn set_topic(&self, room: &RoomId, topic: &str) -> Result<(), RoomError> {
        let mut rooms = self.rooms();
        let entry = rooms
            .get_mut(room)
            .ok_or_else(|| RoomError::NotJoined(room.to_string()))?;
        entry.topic = Some(topic.to_string());
        Ok(())
    }
}
