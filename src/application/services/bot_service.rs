//! Bot core - wires the dispatcher and the room relay to a backend

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::application::errors::BotError;
use crate::application::messaging::{Dispatcher, Templates};
use crate::application::relay::{RelayTable, RoomRelay};
use crate::domain::entities::{
    CommandRegistry, Identifier, JoinedRoomSet, Message, RoomId,
};
use crate::domain::traits::{Backend, EventHandler};
use crate::infrastructure::config::Config;
use crate::plugins;

/// The process-wide bot state: command registry, templates, joined rooms,
/// dispatcher and relay, all bound to one backend connection.
///
/// Adapters drive it through the [`EventHandler`] callbacks; inbound events
/// for one connection are handled strictly in arrival order.
pub struct BotService {
    identity: Identifier,
    prefix: String,
    registry: Arc<RwLock<CommandRegistry>>,
    rooms: Arc<JoinedRoomSet>,
    dispatcher: Dispatcher,
    relay: RoomRelay,
}

impl BotService {
    /// Build the full pipeline from configuration, registering the built-in
    /// command plugins.
    pub fn from_config(config: &Config, backend: Arc<dyn Backend>) -> Result<Self, BotError> {
        let identity = Identifier::parse(&config.bot.identity)?;
        let rooms = Arc::new(JoinedRoomSet::new());
        let registry = Arc::new(RwLock::new(CommandRegistry::new()));
        let templates = Arc::new(RwLock::new(Templates::new()));

        plugins::install_builtins(
            &registry,
            &templates,
            plugins::PluginContext {
                backend: backend.clone(),
                rooms: rooms.clone(),
                registry: registry.clone(),
                room_username: config.bot.display_name.clone(),
            },
        );

        let mut admins = Vec::with_capacity(config.admins.len());
        for admin in &config.admins {
            admins.push(Identifier::parse(admin)?);
        }

        let dispatcher = Dispatcher::new(
            identity.clone(),
            registry.clone(),
            templates,
            backend.clone(),
        )
        .with_admins(admins)
        .with_size_limit(config.bot.message_size_limit)
        .with_verbose_errors(config.bot.verbose_command_errors);

        let mut user_to_rooms = std::collections::HashMap::new();
        for (user, room_names) in &config.rooms.relay {
            let targets: Vec<RoomId> = room_names.iter().map(RoomId::new).collect();
            user_to_rooms.insert(user.clone(), targets);
        }
        let mut room_to_users = std::collections::HashMap::new();
        for (room, users) in &config.rooms.reverse_relay {
            let mut targets = Vec::with_capacity(users.len());
            for user in users {
                targets.push(Identifier::parse(user)?);
            }
            room_to_users.insert(room.clone(), targets);
        }

        let relay = RoomRelay::new(
            backend,
            identity.clone(),
            rooms.clone(),
            config.rooms.presence.iter().map(RoomId::new).collect(),
            config.bot.display_name.clone(),
            RelayTable::new(user_to_rooms, room_to_users),
            Duration::from_secs(config.rooms.keepalive_seconds),
        );

        Ok(Self {
            identity,
            prefix: config.bot.prefix.clone(),
            registry,
            rooms,
            dispatcher,
            relay,
        })
    }

    pub fn identity(&self) -> &Identifier {
        &self.identity
    }

    pub fn registry(&self) -> &Arc<RwLock<CommandRegistry>> {
        &self.registry
    }

    pub fn rooms(&self) -> &Arc<JoinedRoomSet> {
        &self.rooms
    }

    /// Stop background work (keep-alive) and mark the session disconnected.
    pub fn deactivate(&self) {
        self.relay.deactivate();
    }
}

#[async_trait]
impl EventHandler for BotService {
    async fn callback_connect(&self) {
        self.relay.callback_connect().await;
    }

    async fn callback_message(&self, message: Message) {
        // Relay side effects first, then command dispatch.
        self.relay.callback_message(&message).await;

        if let Some(text) = message.body.strip_prefix(&self.prefix) {
            self.dispatcher.dispatch(&message, text).await;
        } else {
            debug!("ignoring non-command message from {}", message.from);
        }
    }
}
