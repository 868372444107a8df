//! Room relay - keeps the bot present in configured rooms and cross-posts
//! messages according to a static relay table
//!
//! The relay hooks the same connect/message callbacks as the dispatcher.
//! Everything here is best-effort: a room that cannot be joined or a target
//! that cannot be reached is logged and skipped, never fatal.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::entities::{Identifier, JoinedRoomSet, Message, MessageKind, RoomId};
use crate::domain::traits::Backend;

/// Static relay configuration, built once from the config file.
///
/// The two directions are configured independently; a user may relay into a
/// room without that room relaying back.
#[derive(Default)]
pub struct RelayTable {
    user_to_rooms: HashMap<String, Vec<RoomId>>,
    room_to_users: HashMap<String, Vec<Identifier>>,
}

impl RelayTable {
    pub fn new(
        user_to_rooms: HashMap<String, Vec<RoomId>>,
        room_to_users: HashMap<String, Vec<Identifier>>,
    ) -> Self {
        Self {
            user_to_rooms,
            room_to_users,
        }
    }

    /// Rooms a direct message from this bare address fans out to.
    pub fn rooms_for_user(&self, bare: &str) -> Option<&[RoomId]> {
        self.user_to_rooms.get(bare).map(Vec::as_slice)
    }

    /// Users a broadcast originating in this room fans out to.
    pub fn users_for_room(&self, room: &str) -> Option<&[Identifier]> {
        self.room_to_users.get(room).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.user_to_rooms.is_empty() && self.room_to_users.is_empty()
    }
}

pub struct RoomRelay {
    backend: Arc<dyn Backend>,
    identity: Identifier,
    rooms: Arc<JoinedRoomSet>,
    presence: Vec<RoomId>,
    username: String,
    table: RelayTable,
    keepalive: Duration,
    connected: AtomicBool,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
}

impl RoomRelay {
    pub fn new(
        backend: Arc<dyn Backend>,
        identity: Identifier,
        rooms: Arc<JoinedRoomSet>,
        presence: Vec<RoomId>,
        username: impl Into<String>,
        table: RelayTable,
        keepalive: Duration,
    ) -> Self {
        Self {
            backend,
            identity,
            rooms,
            presence,
            username: username.into(),
            table,
            keepalive,
            connected: AtomicBool::new(false),
            heartbeat: Mutex::new(None),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Join every configured room and start the keep-alive task. Idempotent:
    /// a second call while already connected is a no-op.
    pub async fn callback_connect(&self) {
        if self.connected.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("connected, joining {} configured rooms", self.presence.len());
        for room in &self.presence {
            debug!("trying to join room {}", room);
            match self
                .backend
                .join_room(room, &self.username, None)
                .await
            {
                Ok(handle) => {
                    info!("joined room {} as {}", room, self.username);
                    if let Err(e) = self.rooms.insert(handle) {
                        warn!("{}", e);
                    }
                }
                // A failed join must not keep the rest from being tried.
                Err(e) => warn!("{}", e),
            }
        }
        self.start_keepalive();
    }

    /// Drop connected state and stop the keep-alive task.
    pub fn deactivate(&self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(task) = self
            .heartbeat
            .lock()
            .expect("heartbeat lock poisoned")
            .take()
        {
            task.abort();
        }
    }

    fn start_keepalive(&self) {
        if self.keepalive.is_zero() {
            return;
        }
        info!("starting keep-alive every {:?}", self.keepalive);
        let backend = self.backend.clone();
        let every = self.keepalive;
        // Detached task: it outlives the connect callback and never holds
        // up process exit.
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = backend.heartbeat().await {
                    warn!("keep-alive failed: {}", e);
                }
            }
        });
        *self.heartbeat.lock().expect("heartbeat lock poisoned") = Some(task);
    }

    /// Forward a message per the relay table. Direct messages from
    /// configured senders fan out to their rooms verbatim; broadcasts from
    /// configured rooms fan out to individuals prefixed with the sending
    /// occupant's name.
    pub async fn callback_message(&self, message: &Message) {
        match message.kind {
            MessageKind::Direct => {
                let sender = message.from.bare();
                let Some(rooms) = self.table.rooms_for_user(&sender) else {
                    return;
                };
                debug!("relaying direct message from {}", sender);
                for room in rooms {
                    self.relay_to_room(room, &message.body).await;
                }
            }
            MessageKind::Broadcast => {
                let room = message.from.bare();
                let Some(users) = self.table.users_for_room(&room) else {
                    return;
                };
                debug!("relaying broadcast from {} to {} users", room, users.len());
                let occupant = message
                    .from
                    .resource()
                    .unwrap_or_else(|| message.from.person());
                let body = format!("[{}] {}", occupant, message.body);
                for user in users {
                    let out = Message::new(self.identity.clone(), user.clone(), body.clone());
                    if let Err(e) = self.backend.send(out).await {
                        warn!("relay to {} failed: {}", user, e);
                    }
                }
            }
        }
    }

    async fn relay_to_room(&self, room: &RoomId, body: &str) {
        // Relay targets are best-effort; a bad address only costs this
        // target, not the rest of the fan-out.
        let to = match Identifier::parse(room.as_str()) {
            Ok(id) => id,
            Err(e) => {
                warn!("relay target {} skipped: {}", room, e);
                return;
            }
        };
        let out = Message::new(self.identity.clone(), to, body)
            .with_kind(MessageKind::Broadcast);
        if let Err(e) = self.backend.send(out).await {
            warn!("relay to {} failed: {}", room, e);
        }
    }
}
