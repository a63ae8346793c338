//! `arena_shared`
//!
//! Shared libraries used by both client and server.
//!
//! Design goals:
//! - One definition of the wire protocol for both ends.
//! - Transport-agnostic codec; stream framing kept separate.
//! - No `unsafe`.

pub mod config;
pub mod frame;
pub mod math;
pub mod net;
