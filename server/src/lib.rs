//! # Snake Arcade Server Library
//!
//! This library provides the authoritative server implementation for the
//! multiplayer snake arcade game. It owns the canonical simulation, accepts
//! client connections over TCP, applies their directional input, and
//! broadcasts the resulting world state to every connected client once per
//! tick.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The server runs the only copy of the game rules. Movement, food
//! consumption, collision resolution, and scoring are all decided here;
//! clients only render the state they are sent.
//!
//! ### Connection Management
//! Handles the complete lifecycle of client connections:
//! - Connection acceptance and player slot assignment
//! - Capacity enforcement (accepted-then-closed beyond the player limit)
//! - Liveness tracking and dead-connection pruning
//!
//! ### State Broadcasting
//! Serializes a deep snapshot of the simulation after every tick and pushes
//! it to every live connection as one newline-terminated JSON frame.
//!
//! ## Architecture Design
//!
//! Two long-lived execution contexts cooperate after startup: an accept task
//! that registers new connections, and the simulate loop that drains client
//! frames, advances the game on a fixed 120 ms tick, and broadcasts. The
//! connection set is shared between them behind a single lock; the pending
//! input table has its own lock; the simulation itself is only ever touched
//! by the simulate loop. Shutdown is a cooperative stop flag checked at the
//! top of each loop iteration.
//!
//! ## Module Organization
//!
//! ### Connection Module (`connection`)
//! One accepted socket: non-blocking receive, flushing send, explicit
//! liveness, and newline reframing of the byte stream.
//!
//! ### Connection Manager Module (`connection_manager`)
//! The lock-scoped coordinator for the connection set: registration,
//! capacity, pruning, and broadcast.
//!
//! ### Game Module (`game`)
//! The deterministic simulation: spawn layout, per-tick movement, food and
//! collision resolution, win/loss bookkeeping, and deep snapshots.
//!
//! ### Network Module (`network`)
//! The `GameServer` orchestrator: listener, accept loop, simulate loop,
//! pending-input table, and graceful stop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::GameServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let mut server = GameServer::bind("0.0.0.0:8765").await?;
//!
//!     // Runs the accept and simulate loops until the stop flag drops.
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod connection_manager;
pub mod game;
pub mod network;
