//! # Authority Server Library
//!
//! The authoritative side of the grid-world synchronization service. One
//! process owns the canonical world: every registered player's position,
//! health and last accepted sequence number, plus a handful of world-level
//! flags. Clients talk to it over TCP with a call/response protocol and poll
//! it for full snapshots.
//!
//! ## Consistency Model
//!
//! Writes are last-writer-wins per player, ordered by the sequence number the
//! client attaches to each movement. A movement whose sequence is not strictly
//! greater than the stored one is rejected without touching the store, so
//! duplicates and late arrivals are harmless. World flags carry no ordering
//! token at all: whoever writes last wins.
//!
//! ## Module Organization
//!
//! ### Store Module (`store`)
//! Plain in-memory map from identity to `PlayerState`, plus the world flags.
//! No locking of its own.
//!
//! ### Reconciler Module (`reconciler`)
//! The sequence check. A pure function over the store that either commits a
//! movement or reports it stale.
//!
//! ### Authority Module (`authority`)
//! Owns the store behind a single lock and exposes the five operations:
//! register, disconnect, apply movement, apply logical event, get state.
//!
//! ### Network Module (`network`)
//! TCP listener, one task per connection, length-prefixed bincode frames.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::authority::Authority;
//! use server::network::Server;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let authority = Arc::new(Authority::new());
//!     let server = Server::new("0.0.0.0:8932", authority).await?;
//!     server.run().await.map_err(|e| e.to_string())?;
//!     Ok(())
//! }
//! ```

pub mod authority;
pub mod network;
pub mod reconciler;
pub mod store;
