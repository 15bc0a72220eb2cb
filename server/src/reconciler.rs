//! Sequence-ordered movement acceptance
//!
//! Every player carries the sequence number of its last accepted write. A
//! movement is committed only when its sequence is strictly greater; equal
//! or lower sequences are duplicates or late arrivals and leave the store
//! untouched. Sequences are chosen by the client, one counter per identity.

use crate::store::PlayerStore;
use shared::{MovementRequest, SyncError};

/// Outcome of reconciling one movement against the stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Committed,
    /// Rejected without mutation; `stored` is the sequence that won.
    Stale { stored: u64 },
}

impl Verdict {
    pub fn accepted(&self) -> bool {
        matches!(self, Verdict::Committed)
    }
}

/// Applies `request` to `store` if it is newer than what is stored.
///
/// Position, health and sequence are overwritten together. Unknown
/// identities fail with `PlayerNotFound` and do not touch the store.
pub fn reconcile(store: &mut PlayerStore, request: &MovementRequest) -> Result<Verdict, SyncError> {
    let player = store
        .get_mut(&request.id)
        .ok_or_else(|| SyncError::PlayerNotFound(request.id.clone()))?;

    if request.sequence <= player.sequence {
        return Ok(Verdict::Stale {
            stored: player.sequence,
        });
    }

    player.x = request.x;
    player.y = request.y;
    player.health = request.health;
    player.sequence = request.sequence;

    Ok(Verdict::Committed)
}
