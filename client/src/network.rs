use crate::game::{ClientGameState, MoveOutcome, MoveState, TerrainMap};
use crate::input::{InputReader, Intent};
use crate::rendering::{Frame, Renderer};
use log::{debug, info, warn};
use shared::framing::{recv_message, send_message, FrameConfig, FrameError};
use shared::{GlobalState, LogicalEvent, MovementRequest, Reply, Request, DEFAULT_HEALTH};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufRead;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("could not connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("transport failure: {0}")]
    Transport(#[from] FrameError),
    #[error("authority error: {0}")]
    Remote(String),
    #[error("no sequence numbers left for {0}")]
    SequenceExhausted(String),
    #[error("unexpected reply to {call}: {reply:?}")]
    UnexpectedReply { call: &'static str, reply: Reply },
}

/// How rejected movements are resubmitted.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClientConfig {
    pub poll_interval: Duration,
    pub render_interval: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            render_interval: Duration::from_millis(50),
            retry: RetryPolicy::default(),
        }
    }
}

/// One TCP connection to the authority with at most one call in flight.
///
/// A transport failure drops the stream; the next call dials again, so a
/// restarted authority is picked up by the following poll.
pub struct RpcClient {
    addr: String,
    stream: Mutex<Option<TcpStream>>,
    frame_config: FrameConfig,
}

impl RpcClient {
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        let stream = dial(addr).await?;
        Ok(Self {
            addr: addr.to_string(),
            stream: Mutex::new(Some(stream)),
            frame_config: FrameConfig::default(),
        })
    }

    pub async fn call(&self, request: &Request) -> Result<Reply, ClientError> {
        let mut guard = self.stream.lock().await;
        let mut stream = match guard.take() {
            Some(stream) => stream,
            None => dial(&self.addr).await?,
        };

        let result = async {
            send_message(&mut stream, request, &self.frame_config).await?;
            recv_message::<_, Reply>(&mut stream, &self.frame_config).await
        }
        .await;

        // a stream that failed mid-call is dropped, not put back
        let reply = result.map_err(ClientError::Transport)?;
        *guard = Some(stream);

        match reply {
            Reply::Error(message) => Err(ClientError::Remote(message)),
            reply => Ok(reply),
        }
    }

    async fn call_ack(&self, request: Request) -> Result<bool, ClientError> {
        match self.call(&request).await? {
            Reply::Ack(value) => Ok(value),
            reply => Err(ClientError::UnexpectedReply {
                call: request.name(),
                reply,
            }),
        }
    }

    pub async fn register_player(&self, id: &str) -> Result<bool, ClientError> {
        self.call_ack(Request::RegisterPlayer { id: id.to_string() })
            .await
    }

    pub async fn disconnect_player(&self, id: &str) -> Result<bool, ClientError> {
        self.call_ack(Request::DisconnectPlayer { id: id.to_string() })
            .await
    }

    pub async fn get_state(&self, id: &str) -> Result<GlobalState, ClientError> {
        let request = Request::GetState { id: id.to_string() };
        match self.call(&request).await? {
            Reply::State(state) => Ok(state),
            reply => Err(ClientError::UnexpectedReply {
                call: request.name(),
                reply,
            }),
        }
    }

    pub async fn apply_movement(&self, movement: &MovementRequest) -> Result<bool, ClientError> {
        self.call_ack(Request::ApplyMovement(movement.clone())).await
    }

    pub async fn apply_logical_event(&self, event: LogicalEvent) -> Result<bool, ClientError> {
        self.call_ack(Request::ApplyLogicalEvent(event)).await
    }
}

async fn dial(addr: &str) -> Result<TcpStream, ClientError> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|source| ClientError::Connect {
            addr: addr.to_string(),
            source,
        })?;
    stream.set_nodelay(true).ok();
    Ok(stream)
}

/// A registered player session: optimistic local play plus the polling,
/// rendering and input loops that keep it in step with the authority.
pub struct Client {
    id: String,
    rpc: Arc<RpcClient>,
    game: Arc<RwLock<ClientGameState>>,
    snapshot: Arc<RwLock<Option<GlobalState>>>,
    terrain: Arc<dyn TerrainMap>,
    config: ClientConfig,
}

impl Client {
    /// Connects, registers `id` and seeds the local player from the
    /// authority. Any failure here is fatal to the caller.
    pub async fn connect(
        id: &str,
        addr: &str,
        terrain: Arc<dyn TerrainMap>,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        info!("Connecting to {} as {}", addr, id);
        let rpc = Arc::new(RpcClient::connect(addr).await?);

        if !rpc.register_player(id).await? {
            return Err(ClientError::Remote(format!("registration of {} refused", id)));
        }

        let spawn = (shared::SPAWN_X, shared::SPAWN_Y);
        let mut game = ClientGameState::new(id, spawn, DEFAULT_HEALTH);
        let state = rpc.get_state(id).await?;
        if let Some(stored) = state.player(id) {
            game.adopt_authoritative(stored);
        }
        if game.sequence_exhausted() {
            return Err(ClientError::SequenceExhausted(id.to_string()));
        }
        info!("Registered as {} ({} players online)", id, state.players.len());

        Ok(Self {
            id: id.to_string(),
            rpc,
            game: Arc::new(RwLock::new(game)),
            snapshot: Arc::new(RwLock::new(Some(state))),
            terrain,
            config,
        })
    }

    pub async fn snapshot(&self) -> Option<GlobalState> {
        self.snapshot.read().await.clone()
    }

    pub async fn move_state(&self) -> MoveState {
        self.game.read().await.state()
    }

    pub async fn last_outcome(&self) -> Option<MoveOutcome> {
        self.game.read().await.last_outcome()
    }

    pub async fn frame(&self) -> Frame {
        build_frame(&self.game, &self.snapshot).await
    }

    /// Fetches one snapshot. On failure the previous one is kept.
    pub async fn poll_once(&self) -> bool {
        poll_into(&self.rpc, &self.id, &self.snapshot).await
    }

    pub fn spawn_poller(&self) -> JoinHandle<()> {
        let rpc = Arc::clone(&self.rpc);
        let snapshot = Arc::clone(&self.snapshot);
        let id = self.id.clone();
        let period = self.config.poll_interval;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                poll_into(&rpc, &id, &snapshot).await;
            }
        })
    }

    pub fn spawn_renderer<W>(&self, mut renderer: Renderer<W>) -> JoinHandle<()>
    where
        W: Write + Send + 'static,
    {
        let game = Arc::clone(&self.game);
        let snapshot = Arc::clone(&self.snapshot);
        let period = self.config.render_interval;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let frame = build_frame(&game, &snapshot).await;
                if let Err(e) = renderer.render(frame) {
                    warn!("Render failed: {}", e);
                }
            }
        })
    }

    /// Moves locally, then reports the move to the authority. Returns
    /// `None` when the move changed nothing and so was never sent.
    pub async fn move_by(&self, dx: i32, dy: i32) -> Option<MoveOutcome> {
        let request = {
            let mut game = self.game.write().await;
            game.apply_local_move(dx, dy, self.terrain.as_ref())?
        };
        Some(self.submit_with_retry(&request).await)
    }

    /// Sends `request` and resends it unchanged while the authority rejects
    /// it, up to the policy's attempt cap with a fixed pause in between.
    pub async fn submit_with_retry(&self, request: &MovementRequest) -> MoveOutcome {
        let policy = self.config.retry;
        let max_attempts = policy.max_attempts.max(1);

        let outcome = 'attempts: {
            for attempt in 1..=max_attempts {
                self.game
                    .write()
                    .await
                    .set_state(MoveState::AwaitingAck { attempt });

                match self.rpc.apply_movement(request).await {
                    Ok(true) => {
                        break 'attempts MoveOutcome::Committed { attempts: attempt };
                    }
                    Ok(false) => {
                        debug!(
                            "[{}] seq {} rejected (attempt {}/{})",
                            self.id, request.sequence, attempt, max_attempts
                        );
                        if attempt < max_attempts {
                            self.game
                                .write()
                                .await
                                .set_state(MoveState::Retrying { attempt });
                            sleep(policy.backoff).await;
                        }
                    }
                    Err(e) => {
                        warn!(
                            "[{}] movement seq {} failed: {}",
                            self.id, request.sequence, e
                        );
                        break 'attempts MoveOutcome::Failed;
                    }
                }
            }
            MoveOutcome::GaveUp {
                attempts: max_attempts,
            }
        };

        self.game.write().await.settle(outcome);
        outcome
    }

    /// Flips the shared trigger relative to the last snapshot seen.
    pub async fn toggle_trigger(&self) -> Result<bool, ClientError> {
        let current = self
            .snapshot
            .read()
            .await
            .as_ref()
            .map(|s| s.flags.trigger_active)
            .unwrap_or(false);

        self.rpc
            .apply_logical_event(LogicalEvent {
                trigger_active: Some(!current),
                portal_active: None,
            })
            .await
    }

    /// Handles one intent. Returns false when the session should end.
    pub async fn handle_intent(&self, intent: Intent) -> bool {
        match intent {
            Intent::Move { dx, dy } => {
                self.move_by(dx, dy).await;
                if self.game.read().await.session_over() {
                    info!("[{}] session over", self.id);
                    return false;
                }
                true
            }
            Intent::Interact => {
                if let Err(e) = self.toggle_trigger().await {
                    warn!("[{}] interact failed: {}", self.id, e);
                }
                true
            }
            Intent::Quit => false,
        }
    }

    /// Best-effort disconnect; errors are ignored.
    pub async fn shutdown(&self) {
        match self.rpc.disconnect_player(&self.id).await {
            Ok(_) => info!("[{}] disconnected", self.id),
            Err(e) => debug!("[{}] disconnect failed: {}", self.id, e),
        }
    }

    /// Runs the session until the input ends or health runs out.
    pub async fn run<R, W>(self, mut input: InputReader<R>, renderer: Renderer<W>)
    where
        R: AsyncBufRead + Unpin,
        W: Write + Send + 'static,
    {
        let poller = self.spawn_poller();
        let render = self.spawn_renderer(renderer);

        loop {
            let intent = input.next_intent().await;
            if !self.handle_intent(intent).await {
                break;
            }
        }

        self.shutdown().await;
        poller.abort();
        render.abort();
    }
}

/// Merges the client's own optimistic player with everyone else from the
/// last snapshot. Never waits on the network.
async fn build_frame(
    game: &RwLock<ClientGameState>,
    snapshot: &RwLock<Option<GlobalState>>,
) -> Frame {
    let snapshot = snapshot.read().await;
    let game = game.read().await;
    Frame {
        players: game.render_view(snapshot.as_ref()),
        flags: snapshot.as_ref().map(|s| s.flags),
    }
}

async fn poll_into(rpc: &RpcClient, id: &str, slot: &RwLock<Option<GlobalState>>) -> bool {
    match rpc.get_state(id).await {
        Ok(state) => {
            *slot.write().await = Some(state);
            true
        }
        Err(e) => {
            warn!("[{}] poll failed, keeping last snapshot: {}", id, e);
            false
        }
    }
}
