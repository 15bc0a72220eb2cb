use log::debug;
use shared::{GlobalState, MovementRequest, PlayerState};

/// Decoded terrain cell, as produced by whatever loaded the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Wall,
    Vegetation,
    Hazard,
}

impl Cell {
    pub fn blocks_movement(self) -> bool {
        matches!(self, Cell::Wall | Cell::Hazard)
    }
}

/// Read-only terrain lookup the client checks moves against. Coordinates
/// outside the map must report a blocking cell.
pub trait TerrainMap: Send + Sync {
    fn cell(&self, x: i32, y: i32) -> Cell;
}

/// Rectangular field walled in on its border, with optional hazard cells.
#[derive(Debug, Clone)]
pub struct OpenField {
    width: i32,
    height: i32,
    hazards: Vec<(i32, i32)>,
}

impl OpenField {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            hazards: Vec::new(),
        }
    }

    pub fn with_hazard(mut self, x: i32, y: i32) -> Self {
        self.hazards.push((x, y));
        self
    }
}

impl TerrainMap for OpenField {
    fn cell(&self, x: i32, y: i32) -> Cell {
        if x <= 0 || y <= 0 || x >= self.width - 1 || y >= self.height - 1 {
            Cell::Wall
        } else if self.hazards.contains(&(x, y)) {
            Cell::Hazard
        } else {
            Cell::Empty
        }
    }
}

/// Where the most recent local move is in its round trip to the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveState {
    Idle,
    LocalMoveApplied,
    AwaitingAck { attempt: u32 },
    Retrying { attempt: u32 },
    Committed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Committed { attempts: u32 },
    /// Every attempt was rejected as stale; the next poll settles it.
    GaveUp { attempts: u32 },
    /// Transport failure or unknown player; no further attempts were made.
    Failed,
}

/// The client's own player, ahead of the authority by whatever is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPlayer {
    pub x: i32,
    pub y: i32,
    pub health: u32,
}

pub struct ClientGameState {
    id: String,
    player: LocalPlayer,
    next_sequence: u64,
    sequence_exhausted: bool,
    state: MoveState,
    last_outcome: Option<MoveOutcome>,
}

impl ClientGameState {
    pub fn new(id: impl Into<String>, spawn: (i32, i32), health: u32) -> Self {
        Self {
            id: id.into(),
            player: LocalPlayer {
                x: spawn.0,
                y: spawn.1,
                health,
            },
            next_sequence: 1,
            sequence_exhausted: false,
            state: MoveState::Idle,
            last_outcome: None,
        }
    }

    pub fn player(&self) -> &LocalPlayer {
        &self.player
    }

    pub fn state(&self) -> MoveState {
        self.state
    }

    pub fn set_state(&mut self, state: MoveState) {
        self.state = state;
    }

    pub fn last_outcome(&self) -> Option<MoveOutcome> {
        self.last_outcome
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// No sequence number above the last one is left, so the authority
    /// would reject every further move from this identity.
    pub fn sequence_exhausted(&self) -> bool {
        self.sequence_exhausted
    }

    /// Health has run out or the sequence space is used up; the session
    /// should end locally.
    pub fn session_over(&self) -> bool {
        self.player.health == 0 || self.sequence_exhausted
    }

    /// Takes over what the authority already knows about this identity.
    ///
    /// Used once after registering, so a reconnecting client continues from
    /// its stored position and numbers its moves past the stored sequence.
    pub fn adopt_authoritative(&mut self, stored: &PlayerState) {
        self.player = LocalPlayer {
            x: stored.x,
            y: stored.y,
            health: stored.health,
        };
        match stored.sequence.checked_add(1) {
            Some(next) => self.next_sequence = self.next_sequence.max(next),
            None => self.sequence_exhausted = true,
        }
    }

    /// Applies a move to the local copy right away and returns the request
    /// to send, or `None` when neither position nor health changed.
    ///
    /// A blocking cell keeps the player in place; a hazard also costs one
    /// health. Other players never block: only terrain is checked locally.
    pub fn apply_local_move(
        &mut self,
        dx: i32,
        dy: i32,
        terrain: &dyn TerrainMap,
    ) -> Option<MovementRequest> {
        if self.session_over() {
            return None;
        }

        let (tx, ty) = (self.player.x + dx, self.player.y + dy);
        let target = terrain.cell(tx, ty);
        let before = self.player.clone();

        if target == Cell::Hazard {
            self.player.health = self.player.health.saturating_sub(1);
            debug!(
                "[{}] hit hazard at ({}, {}), health {}",
                self.id, tx, ty, self.player.health
            );
        }
        if !target.blocks_movement() {
            self.player.x = tx;
            self.player.y = ty;
        }

        if self.player == before {
            self.state = MoveState::Idle;
            return None;
        }

        self.state = MoveState::LocalMoveApplied;
        let sequence = self.next_sequence;
        match sequence.checked_add(1) {
            Some(next) => self.next_sequence = next,
            None => self.sequence_exhausted = true,
        }

        Some(MovementRequest {
            id: self.id.clone(),
            x: self.player.x,
            y: self.player.y,
            sequence,
            health: self.player.health,
        })
    }

    pub fn settle(&mut self, outcome: MoveOutcome) {
        self.state = match outcome {
            MoveOutcome::Committed { .. } => MoveState::Committed,
            MoveOutcome::GaveUp { .. } | MoveOutcome::Failed => MoveState::Idle,
        };
        self.last_outcome = Some(outcome);
    }

    fn last_sequence(&self) -> u64 {
        if self.sequence_exhausted {
            u64::MAX
        } else {
            self.next_sequence - 1
        }
    }

    /// Own optimistic player first, then everyone else from the snapshot.
    ///
    /// The snapshot's entry for this identity is skipped: it lags behind
    /// the local copy and must never overwrite it.
    pub fn render_view(&self, snapshot: Option<&GlobalState>) -> Vec<PlayerState> {
        let mut view = vec![PlayerState {
            id: self.id.clone(),
            x: self.player.x,
            y: self.player.y,
            health: self.player.health,
            sequence: self.last_sequence(),
        }];

        if let Some(snapshot) = snapshot {
            view.extend(snapshot.others(&self.id).into_iter().cloned());
        }
        view
    }
}
