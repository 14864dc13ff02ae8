use async_trait::async_trait;

use crate::error::Error;
use crate::models::{FavoriteEntry, UserId};

#[async_trait]
pub trait FavoritesRepository: Send + Sync {
    /// Append one row. Duplicates are allowed.
    async fn add_favorite(&self, entry: &FavoriteEntry) -> Result<(), Error>;

    /// All rows for `user_id`, oldest first.
    async fn list_favorites(&self, user_id: UserId) -> Result<Vec<FavoriteEntry>, Error>;
}
