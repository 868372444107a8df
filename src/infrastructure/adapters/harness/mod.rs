//! Test harness adapter
//!
//! An in-memory backend: inbound messages are injected by the test, every
//! outbound message lands in a queue the test can pop, and room operations
//! are recorded instead of hitting a real service. Joins and sends can be
//! made to fail on demand to exercise the error paths.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

use crate::application::errors::{BotError, DeliveryError, RoomError};
use crate::domain::entities::{Identifier, Message, RoomHandle, RoomId};
use crate::domain::traits::{Backend, EventHandler};

#[derive(Default)]
struct HarnessState {
    outgoing: VecDeque<Message>,
    join_log: Vec<(RoomId, String)>,
    op_log: Vec<String>,
    occupants: HashMap<RoomId, Vec<Identifier>>,
    topics: HashMap<RoomId, String>,
    failing_joins: HashSet<RoomId>,
    failing_targets: HashSet<String>,
}

/// In-memory backend for tests
pub struct HarnessAdapter {
    state: Mutex<HarnessState>,
    heartbeats: AtomicUsize,
    inbound_tx: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    inbound_rx: tokio::sync::Mutex<Option<mpsc::UnboundedReceiver<Message>>>,
}

impl HarnessAdapter {
    pub fn new() -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            state: Mutex::new(HarnessState::default()),
            heartbeats: AtomicUsize::new(0),
            inbound_tx: Mutex::new(Some(tx)),
            inbound_rx: tokio::sync::Mutex::new(Some(rx)),
        })
    }

    fn state(&self) -> std::sync::MutexGuard<'_, HarnessState> {
        self.state.lock().expect("harness state lock poisoned")
    }

    /// Queue an inbound message for a running [`serve`](Backend::serve) loop.
    pub fn inject(&self, message: Message) {
        if let Some(tx) = self
            .inbound_tx
            .lock()
            .expect("harness inbound lock poisoned")
            .as_ref()
        {
            let _ = tx.send(message);
        }
    }

    /// Close the inbound queue; `serve` drains what is left and returns.
    pub fn close(&self) {
        self.inbound_tx
            .lock()
            .expect("harness inbound lock poisoned")
            .take();
    }

    /// Pop the oldest outbound message, if any.
    pub fn pop_message(&self) -> Option<Message> {
        self.state().outgoing.pop_front()
    }

    pub fn pending_messages(&self) -> usize {
        self.state().outgoing.len()
    }

    pub fn heartbeat_count(&self) -> usize {
        self.heartbeats.load(Ordering::SeqCst)
    }

    /// Rooms joined through this backend, in join order.
    pub fn join_log(&self) -> Vec<(RoomId, String)> {
        self.state().join_log.clone()
    }

    /// Recorded non-join room operations ("create room@x", ...).
    pub fn op_log(&self) -> Vec<String> {
        self.state().op_log.clone()
    }

    /// Make future joins of `room` fail.
    pub fn fail_join(&self, room: RoomId) {
        self.state().failing_joins.insert(room);
    }

    /// Make future sends to `target` (bare address) fail.
    pub fn fail_sends_to(&self, target: impl Into<String>) {
        self.state().failing_targets.insert(target.into());
    }

    pub fn set_occupants(&self, room: RoomId, occupants: Vec<Identifier>) {
        self.state().occupants.insert(room, occupants);
    }
}

#[async_trait]
impl Backend for HarnessAdapter {
    fn name(&self) -> &str {
        "harness"
    }

    async fn serve(&self, handler: Arc<dyn EventHandler>) -> Result<(), BotError> {
        let mut rx = self
            .inbound_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| BotError::Internal("harness already serving".to_string()))?;

        info!("harness backend up");
        handler.callback_connect().await;
        while let Some(message) = rx.recv().await {
            handler.callback_message(message).await;
        }
        Ok(())
    }

    async fn send(&self, message: Message) -> Result<(), DeliveryError> {
        let mut state = self.state();
        let target = message.to.bare();
        if state.failing_targets.contains(&target) {
            return Err(DeliveryError::new(target, "harness configured to fail"));
        }
        state.outgoing.push_back(message);
        Ok(())
    }

    async fn join_room(
        &self,
        room: &RoomId,
        username: &str,
        _password: Option<&str>,
    ) -> Result<RoomHandle, RoomError> {
        let mut state = self.state();
        if state.failing_joins.contains(room) {
            return Err(RoomError::Join(
                room.to_string(),
                "harness configured to fail".to_string(),
            ));
        }
        state.join_log.push((room.clone(), username.to_string()));
        Ok(RoomHandle::new(room.clone()))
    }

    async fn leave_room(&self, room: &RoomId) -> Result<(), RoomError> {
        self.state().op_log.push(format!("leave {}", room));
        Ok(())
    }

    async fn create_room(&self, room: &RoomId) -> Result<(), RoomError> {
        self.state().op_log.push(format!("create {}", room));
        Ok(())
    }

    async fn destroy_room(&self, room: &RoomId) -> Result<(), RoomError> {
        self.state().op_log.push(format!("destroy {}", room));
        Ok(())
    }

    async fn invite(&self, room: &RoomId, invitees: &[Identifier]) -> Result<(), RoomError> {
        let who: Vec<String> = invitees.iter().map(|i| i.to_string()).collect();
        self.state()
            .op_log
            .push(format!("invite {} -> {}", who.join(","), room));
        Ok(())
    }

    async fn occupants(&self, room: &RoomId) -> Result<Vec<Identifier>, RoomError> {
        self.state()
            .occupants
            .get(room)
            .cloned()
            .ok_or_else(|| RoomError::NotJoined(room.to_string()))
    }

    async fn topic(&self, room: &RoomId) -> Result<Option<String>, RoomError> {
        Ok(self.state().topics.get(room).cloned())
    }

    async fn set_topic(&self, room: &RoomId, topic: &str) -> Result<(), RoomError> {
        self.state().topics.insert(room.clone(), topic.to_string());
        Ok(())
    }

    async fn heartbeat(&self) -> Result<(), DeliveryError> {
        self.heartbeats.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
