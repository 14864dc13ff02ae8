// src/repositories/mod.rs

pub mod sqlite;

pub use sqlite::favorites::SqliteFavoritesRepository;
pub use tunebot_common::traits::FavoritesRepository;
