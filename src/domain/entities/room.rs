use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::application::errors::RoomError;

/// Address of a room or channel.
///
/// The core treats room addresses opaquely; backends decide whether they
/// look like `room@conference.host` or `#channel`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoomId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Handle returned by a backend when a room has been joined
#[derive(Debug, Clone)]
pub struct RoomHandle {
    pub room: RoomId,
    pub joined_at: DateTime<Utc>,
}

impl RoomHandle {
    pub fn new(room: RoomId) -> Self {
        Self {
            room,
            joined_at: Utc::now(),
        }
    }
}

/// The set of rooms the bot currently occupies.
///
/// Join/leave are exclusive per room key: a second join for the same room
/// is rejected inside the lock, so concurrent joiners cannot both succeed.
#[derive(Default)]
pub struct JoinedRoomSet {
    rooms: Mutex<HashMap<RoomId, RoomHandle>>,
}

impl JoinedRoomSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a joined room. Fails if the room is already present.
    pub fn insert(&self, handle: RoomHandle) -> Result<(), RoomError> {
        let mut rooms = self.rooms.lock().expect("room set lock poisoned");
        if rooms.contains_key(&handle.room) {
            return Err(RoomError::AlreadyJoined(handle.room.to_string()));
        }
        rooms.insert(handle.room.clone(), handle);
        Ok(())
    }

    /// Remove a room from the set. Fails if the room was not joined.
    pub fn remove(&self, room: &RoomId) -> Result<RoomHandle, RoomError> {
        let mut rooms = self.rooms.lock().expect("room set lock poisoned");
        rooms
            .remove(room)
            .ok_or_else(|| RoomError::NotJoined(room.to_string()))
    }

    pub fn contains(&self, room: &RoomId) -> bool {
        self.rooms
            .lock()
            .expect("room set lock poisoned")
            .contains_key(room)
    }

    /// Snapshot of the joined room ids, sorted for stable listings.
    pub fn list(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self
            .rooms
            .lock()
            .expect("room set lock poisoned")
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.rooms.lock().expect("room set lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
