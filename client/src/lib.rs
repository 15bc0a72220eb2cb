//! # Grid Client Library
//!
//! Client side of the grid-world synchronization service. The client plays
//! optimistically: a move is applied to its own copy of the world at once,
//! checked only against its local terrain, and reported to the authority
//! afterwards. The authority may reject the report as stale; the client
//! resends it a bounded number of times and then lets the next poll settle
//! things.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! Local player state, the terrain seam (`TerrainMap`), the per-move state
//! machine and the merge of local and authoritative state for display.
//!
//! ### Input Module (`input`)
//! Turns command lines into movement, interact and quit intents.
//!
//! ### Network Module (`network`)
//! The RPC connection to the authority, retry policy, and the `Client`
//! session that runs the polling, rendering and input loops.
//!
//! ### Rendering Module (`rendering`)
//! A textual status line built from the latest snapshot plus the local
//! player, written only when it changes.
//!
//! ## Concurrency
//!
//! Three loops run at once: a poller fetching full snapshots on a fixed
//! interval, a renderer reading the last snapshot on its own interval, and
//! the input loop on the caller's task. They share the last snapshot and
//! the local game state through `RwLock`s. Rendering never waits on the
//! network, and a failed poll keeps the previous snapshot.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::OpenField;
//! use client::input::InputReader;
//! use client::network::{Client, ClientConfig};
//! use client::rendering::Renderer;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let terrain = Arc::new(OpenField::new(40, 20));
//!     let config = ClientConfig::default();
//!     let client = Client::connect("p1", "127.0.0.1:8932", terrain, config).await?;
//!
//!     let input = InputReader::new(tokio::io::BufReader::new(tokio::io::stdin()));
//!     client.run(input, Renderer::new(std::io::stdout())).await;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
