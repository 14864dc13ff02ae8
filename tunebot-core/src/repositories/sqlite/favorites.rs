// File: tunebot-core/src/repositories/sqlite/favorites.rs

use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};
use twilight_model::id::Id;

use tunebot_common::error::Error;
use tunebot_common::models::{FavoriteEntry, UserId};
use tunebot_common::traits::FavoritesRepository;

pub struct SqliteFavoritesRepository {
    pub pool: Pool<Sqlite>,
}

impl SqliteFavoritesRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

// Snowflakes are stored in SQLite's signed 64-bit INTEGER column.
fn user_key(user_id: UserId) -> i64 {
    user_id.get() as i64
}

#[async_trait]
impl FavoritesRepository for SqliteFavoritesRepository {
    async fn add_favorite(&self, entry: &FavoriteEntry) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO favorites (user_id, song_title, song_author, song_url)
            VALUES (?, ?, ?, ?)
            "#,
        )
            .bind(user_key(entry.user_id))
            .bind(&entry.song_title)
            .bind(&entry.song_author)
            .bind(&entry.song_url)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_favorites(&self, user_id: UserId) -> Result<Vec<FavoriteEntry>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, song_title, song_author, song_url
            FROM favorites
            WHERE user_id = ?
            ORDER BY rowid
            "#,
        )
            .bind(user_key(user_id))
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            let raw_id: i64 = r.try_get("user_id")?;
            let user_id = Id::new_checked(raw_id as u64)
                .ok_or_else(|| Error::Parse(format!("invalid user id in favorites: {raw_id}")))?;
            out.push(FavoriteEntry {
                user_id,
                song_title: r.try_get("song_title")?,
                song_author: r.try_get("song_author")?,
                song_url: r.try_get("song_url")?,
            });
        }
        Ok(out)
    }
}
