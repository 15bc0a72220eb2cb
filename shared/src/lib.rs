use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod framing;

pub const DEFAULT_PORT: u16 = 8932;
pub const SPAWN_X: i32 = 1;
pub const SPAWN_Y: i32 = 1;
pub const DEFAULT_HEALTH: u32 = 3;

/// Calls a client can make against the authority. The variant is the
/// operation name, its fields are the payload.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Request {
    RegisterPlayer { id: String },
    DisconnectPlayer { id: String },
    GetState { id: String },
    ApplyMovement(MovementRequest),
    ApplyLogicalEvent(LogicalEvent),
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::RegisterPlayer { .. } => "RegisterPlayer",
            Request::DisconnectPlayer { .. } => "DisconnectPlayer",
            Request::GetState { .. } => "GetState",
            Request::ApplyMovement(_) => "ApplyMovement",
            Request::ApplyLogicalEvent(_) => "ApplyLogicalEvent",
        }
    }
}

/// Authority answer to exactly one `Request`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Reply {
    Ack(bool),
    State(GlobalState),
    Error(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlayerState {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub health: u32,
    pub sequence: u64,
}

impl PlayerState {
    /// A freshly registered player: spawn position, full health, sequence 0.
    pub fn spawn(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            x: SPAWN_X,
            y: SPAWN_Y,
            health: DEFAULT_HEALTH,
            sequence: 0,
        }
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }
}

/// World-level switches that belong to no single player.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldFlags {
    pub trigger_active: bool,
    pub portal_active: bool,
}

/// Partial update of the world flags. `None` leaves a flag as it is.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogicalEvent {
    pub trigger_active: Option<bool>,
    pub portal_active: Option<bool>,
}

impl LogicalEvent {
    pub fn apply_to(&self, flags: &mut WorldFlags) {
        if let Some(trigger) = self.trigger_active {
            flags.trigger_active = trigger;
        }
        if let Some(portal) = self.portal_active {
            flags.portal_active = portal;
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct GlobalState {
    pub players: HashMap<String, PlayerState>,
    pub flags: WorldFlags,
}

impl GlobalState {
    pub fn player(&self, id: &str) -> Option<&PlayerState> {
        self.players.get(id)
    }

    /// Every player except `id`, sorted by identity so output is stable.
    pub fn others(&self, id: &str) -> Vec<&PlayerState> {
        let mut others: Vec<&PlayerState> =
            self.players.values().filter(|p| p.id != id).collect();
        others.sort_by(|a, b| a.id.cmp(&b.id));
        others
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MovementRequest {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub sequence: u64,
    pub health: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("player not found: {0}")]
    PlayerNotFound(String),
}
