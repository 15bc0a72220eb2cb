//! The authoritative world state and the operations clients may run on it
//!
//! `Authority` is the only owner of the canonical `PlayerStore`. Every
//! operation takes the same lock for the duration of an O(1) lookup or
//! update (or a copy, for snapshots), and nothing awaits I/O while holding
//! it. Connection tasks share one `Arc<Authority>`.

use crate::reconciler::{reconcile, Verdict};
use crate::store::PlayerStore;
use log::{debug, info, trace};
use shared::{GlobalState, LogicalEvent, MovementRequest, SyncError};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct Authority {
    store: Mutex<PlayerStore>,
}

impl Authority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `id` at the spawn point. Re-registering leaves the existing
    /// player untouched and still succeeds.
    pub async fn register(&self, id: &str) -> bool {
        let mut store = self.store.lock().await;
        if store.insert_if_absent(id) {
            info!("[{}] registered ({} players now)", id, store.len());
        } else {
            debug!("[{}] already registered", id);
        }
        true
    }

    /// Removes `id`. Unknown identities are acknowledged as well.
    pub async fn disconnect(&self, id: &str) -> bool {
        let mut store = self.store.lock().await;
        if store.remove(id).is_some() {
            info!("[{}] disconnected ({} players left)", id, store.len());
        } else {
            debug!("[{}] disconnect for unknown player ignored", id);
        }
        true
    }

    /// Commits `request` if its sequence is newer than the stored one.
    ///
    /// `Ok(false)` is a stale or duplicate write, not an error.
    pub async fn apply_movement(&self, request: &MovementRequest) -> Result<bool, SyncError> {
        let mut store = self.store.lock().await;
        match reconcile(&mut store, request)? {
            Verdict::Committed => {
                debug!(
                    "[{}] move -> ({}, {}) seq={} health={}",
                    request.id, request.x, request.y, request.sequence, request.health
                );
                Ok(true)
            }
            Verdict::Stale { stored } => {
                debug!(
                    "[{}] stale seq {} <= {} ignored",
                    request.id, request.sequence, stored
                );
                Ok(false)
            }
        }
    }

    /// Overwrites the world flags named by `event`. Last write wins.
    pub async fn apply_logical_event(&self, event: &LogicalEvent) -> bool {
        let mut store = self.store.lock().await;
        store.apply_event(event);
        debug!("world flags now {:?}", store.flags());
        true
    }

    /// Full copy of the world. `requester` only shows up in the logs; the
    /// snapshot always contains every player.
    pub async fn get_state(&self, requester: &str) -> GlobalState {
        let store = self.store.lock().await;
        trace!("[{}] requested state ({} players)", requester, store.len());
        store.snapshot()
    }

    pub async fn player_count(&self) -> usize {
        self.store.lock().await.len()
    }
}
