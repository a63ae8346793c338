//! `arena_server`
//!
//! Server-side systems:
//! - Fixed-rate session loop with a single owner of all state
//! - Session registry, entity store, input queue
//! - Full-state snapshot broadcast every tick
//! - Start/stop/restart of the loop as a background task
//!
//! Networking model:
//! - The loop only sees `Connection`s and `SessionEvent`s plus a `Sink` per
//!   session; `transport` provides a TCP implementation of that boundary.

pub mod entities;
pub mod error;
pub mod events;
pub mod hooks;
pub mod input_queue;
pub mod lifecycle;
pub mod registry;
pub mod scheduler;
pub mod server;
pub mod simulation;
pub mod sink;
pub mod transport;

pub use lifecycle::GameLoop;
pub use server::GameServer;
pub use simulation::Simulation;
