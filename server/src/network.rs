//! Server network layer: TCP accept loop and per-connection call handling

use crate::authority::Authority;
use bincode::deserialize;
use log::{debug, error, info, warn};
use shared::framing::{read_frame, send_message, FrameConfig, FrameError};
use shared::{Reply, Request};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

/// Authority server accepting TCP connections, one task per connection
pub struct Server {
    listener: TcpListener,
    authority: Arc<Authority>,
    frame_config: FrameConfig,
}

impl Server {
    pub async fn new(
        addr: &str,
        authority: Arc<Authority>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            authority,
            frame_config: FrameConfig::default(),
        })
    }

    pub fn with_frame_config(mut self, frame_config: FrameConfig) -> Self {
        self.frame_config = frame_config;
        self
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever. Accept failures are logged and skipped.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!("Server started successfully");

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let authority = Arc::clone(&self.authority);
                    let frame_config = self.frame_config;
                    tokio::spawn(async move {
                        handle_connection(stream, addr, authority, frame_config).await;
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}

/// Serves calls from one connection until it closes or framing breaks.
async fn handle_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    authority: Arc<Authority>,
    frame_config: FrameConfig,
) {
    info!("Connection opened from {}", addr);

    loop {
        let payload = match read_frame(&mut stream, &frame_config).await {
            Ok(payload) => payload,
            Err(FrameError::ConnectionClosed) => break,
            Err(e) => {
                warn!("Dropping connection {}: {}", addr, e);
                break;
            }
        };

        let reply = match deserialize::<Request>(&payload) {
            Ok(request) => {
                debug!("{} called {}", addr, request.name());
                dispatch(&authority, request).await
            }
            Err(e) => {
                warn!("Malformed request from {}: {}", addr, e);
                Reply::Error(format!("malformed request: {}", e))
            }
        };

        if let Err(e) = send_message(&mut stream, &reply, &frame_config).await {
            warn!("Failed to reply to {}: {}", addr, e);
            break;
        }
    }

    info!("Connection closed from {}", addr);
}

/// Routes one call to the matching authority operation.
pub async fn dispatch(authority: &Authority, request: Request) -> Reply {
    match request {
        Request::RegisterPlayer { id } => Reply::Ack(authority.register(&id).await),
        Request::DisconnectPlayer { id } => Reply::Ack(authority.disconnect(&id).await),
        Request::GetState { id } => Reply::State(authority.get_state(&id).await),
        Request::ApplyMovement(movement) => match authority.apply_movement(&movement).await {
            Ok(accepted) => Reply::Ack(accepted),
            Err(e) => Reply::Error(e.to_string()),
        },
        Request::ApplyLogicalEvent(event) => {
            Reply::Ack(authority.apply_logical_event(&event).await)
        }
    }
}
