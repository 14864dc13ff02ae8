// src/lib.rs

pub mod config;
pub mod db;
pub mod repositories;
pub mod player;
pub mod lavalink;
pub mod platforms;
pub mod services;
pub mod test_utils;

pub use db::Database;
pub use tunebot_common::error::{CommandError, Error};
