//! In-memory player store backing the authority
//!
//! `PlayerStore` is a plain data structure: it holds one `PlayerState` per
//! registered identity plus the world flags. It does no locking of its own;
//! the `Authority` owns the single lock that guards it, which keeps every
//! operation here synchronous and trivially testable.

use shared::{GlobalState, LogicalEvent, PlayerState, WorldFlags};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct PlayerStore {
    players: HashMap<String, PlayerState>,
    flags: WorldFlags,
}

impl PlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a spawned player unless the identity is already present.
    ///
    /// Returns true when a new player was created. An existing entry is never
    /// reset, which makes registration idempotent.
    pub fn insert_if_absent(&mut self, id: &str) -> bool {
        if self.players.contains_key(id) {
            return false;
        }
        self.players.insert(id.to_string(), PlayerState::spawn(id));
        true
    }

    /// Removes a player. Returns the removed state, if there was one.
    pub fn remove(&mut self, id: &str) -> Option<PlayerState> {
        self.players.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&PlayerState> {
        self.players.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut PlayerState> {
        self.players.get_mut(id)
    }

    pub fn apply_event(&mut self, event: &LogicalEvent) {
        event.apply_to(&mut self.flags);
    }

    pub fn flags(&self) -> WorldFlags {
        self.flags
    }

    /// Deep copy of every player and the flags.
    pub fn snapshot(&self) -> GlobalState {
        GlobalState {
            players: self.players.clone(),
            flags: self.flags,
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
