//! `arena_client`
//!
//! Client-side systems:
//! - Connection and join handshake
//! - Input sampling and per-tick command generation
//! - Snapshot buffering and interpolation for remote entities

pub mod client;
pub mod input;
pub mod interp;

pub use client::GameClient;
