//! Client side of a Lavalink v4 audio node.

pub mod client;
pub mod engine;
pub mod models;

pub use client::LavalinkClient;
pub use engine::LavalinkEngine;
