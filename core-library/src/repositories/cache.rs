//! Library cache writes and engine bookkeeping.
//!
//! [`LibraryCache`] is the write side used by the sync engine: a key/value
//! config table plus wholesale replacement of tracks and albums. The read side
//! lives in the per-entity repositories next to this module.

use crate::error::Result;
use crate::models::{Album, Track};
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// Config key holding the media index generation of the last successful sync.
pub const GENERATION_KEY: &str = "mediastore_generation";

/// Keeps `IN (...)` lists well under SQLite's bound parameter limit.
const DELETE_CHUNK_SIZE: usize = 500;

/// Write access to the library cache.
#[async_trait]
pub trait LibraryCache: Send + Sync {
    async fn get_config_value(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite a config value.
    async fn set_config_value(&self, key: &str, value: &str) -> Result<()>;

    /// Replace the whole track table.
    async fn replace_all_tracks(&self, tracks: &[Track]) -> Result<()>;

    /// Replace the whole album table.
    async fn replace_all_albums(&self, albums: &[Album]) -> Result<()>;

    /// Delete tracks by id. An empty list does nothing.
    async fn delete_tracks(&self, ids: &[i64]) -> Result<()>;

    /// Delete albums by id. An empty list does nothing.
    async fn delete_albums(&self, ids: &[String]) -> Result<()>;

    /// Atomically install the result of a sync.
    ///
    /// Within one transaction: reads the current favorite ids, replaces tracks
    /// (a track whose id was a favorite stays a favorite), replaces albums and,
    /// when `generation` is `Some`, stores it under [`GENERATION_KEY`]. On any
    /// error nothing is changed.
    async fn commit_library(
        &self,
        tracks: &[Track],
        albums: &[Album],
        generation: Option<i64>,
    ) -> Result<()>;

    /// Generation of the last successful sync.
    ///
    /// A missing or unparseable value reads as `None`.
    async fn last_generation(&self) -> Result<Option<i64>> {
        let value = self.get_config_value(GENERATION_KEY).await?;
        Ok(value.and_then(|v| match v.trim().parse::<i64>() {
            Ok(generation) => Some(generation),
            Err(_) => {
                warn!(value = %v, "Ignoring unparseable stored generation");
                None
            }
        }))
    }

    async fn set_last_generation(&self, generation: i64) -> Result<()> {
        self.set_config_value(GENERATION_KEY, &generation.to_string())
            .await
    }
}

/// SQLite implementation of [`LibraryCache`].
#[derive(Debug, Clone)]
pub struct SqliteLibraryCache {
    pool: SqlitePool,
}

impl SqliteLibraryCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// =============================================================================
// Statement helpers shared by the trait methods
// =============================================================================

async fn upsert_config(conn: &mut SqliteConnection, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO config (key, value) VALUES (?, ?) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value)
    .execute(conn)
    .await?;
    Ok(())
}

async fn favorite_ids(conn: &mut SqliteConnection) -> Result<HashSet<i64>> {
    let rows: Vec<(i64,)> = sqlx::query_as("SELECT id FROM tracks WHERE is_favorite = 1")
        .fetch_all(conn)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

async fn insert_track(conn: &mut SqliteConnection, track: &Track, is_favorite: bool) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO tracks (
            id, title, artist, album, album_id, duration_ms, uri,
            disc_number, track_number, is_favorite, lyrics, track_gain, track_peak
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(track.id)
    .bind(&track.title)
    .bind(&track.artist)
    .bind(&track.album)
    .bind(&track.album_id)
    .bind(track.duration_ms)
    .bind(&track.uri)
    .bind(track.disc_number)
    .bind(track.track_number)
    .bind(is_favorite)
    .bind(&track.lyrics)
    .bind(track.track_gain)
    .bind(track.track_peak)
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_album(conn: &mut SqliteConnection, album: &Album) -> Result<()> {
    let palette = album.palette.unwrap_or_default();
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO albums (
            id, name, artist, thumbnail,
            vibrant, dark_vibrant, light_vibrant, muted, dark_muted, light_muted, dominant,
            album_gain, album_peak
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&album.id)
    .bind(&album.name)
    .bind(&album.artist)
    .bind(&album.thumbnail)
    .bind(palette.vibrant.map(i64::from))
    .bind(palette.dark_vibrant.map(i64::from))
    .bind(palette.light_vibrant.map(i64::from))
    .bind(palette.muted.map(i64::from))
    .bind(palette.dark_muted.map(i64::from))
    .bind(palette.light_muted.map(i64::from))
    .bind(palette.dominant.map(i64::from))
    .bind(album.album_gain)
    .bind(album.album_peak)
    .execute(conn)
    .await?;
    Ok(())
}

async fn write_tracks(
    conn: &mut SqliteConnection,
    tracks: &[Track],
    favorites: &HashSet<i64>,
) -> Result<()> {
    sqlx::query("DELETE FROM tracks").execute(&mut *conn).await?;
    for track in tracks {
        let is_favorite = track.is_favorite || favorites.contains(&track.id);
        insert_track(&mut *conn, track, is_favorite).await?;
    }
    Ok(())
}

async fn write_albums(conn: &mut SqliteConnection, albums: &[Album]) -> Result<()> {
    sqlx::query("DELETE FROM albums").execute(&mut *conn).await?;
    for album in albums {
        insert_album(&mut *conn, album).await?;
    }
    Ok(())
}

#[async_trait]
impl LibraryCache for SqliteLibraryCache {
    async fn get_config_value(&self, key: &str) -> Result<Option<String>> {
        let value: Option<(String,)> = sqlx::query_as("SELECT value FROM config WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value.map(|(v,)| v))
    }

    async fn set_config_value(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        upsert_config(&mut conn, key, value).await
    }

    #[instrument(skip(self, tracks), fields(count = tracks.len()))]
    async fn replace_all_tracks(&self, tracks: &[Track]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        write_tracks(&mut tx, tracks, &HashSet::new()).await?;
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, albums), fields(count = albums.len()))]
    async fn replace_all_albums(&self, albums: &[Album]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        write_albums(&mut tx, albums).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_tracks(&self, ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for chunk in ids.chunks(DELETE_CHUNK_SIZE) {
            let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM tracks WHERE id IN (");
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");
            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;

        debug!(count = ids.len(), "Deleted tracks");
        Ok(())
    }

    async fn delete_albums(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for chunk in ids.chunks(DELETE_CHUNK_SIZE) {
            let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM albums WHERE id IN (");
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(id.as_str());
            }
            separated.push_unseparated(")");
            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;

        debug!(count = ids.len(), "Deleted albums");
        Ok(())
    }

    #[instrument(skip(self, tracks, albums), fields(tracks = tracks.len(), albums = albums.len()))]
    async fn commit_library(
        &self,
        tracks: &[Track],
        albums: &[Album],
        generation: Option<i64>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let favorites = favorite_ids(&mut tx).await?;
        write_tracks(&mut tx, tracks, &favorites).await?;
        write_albums(&mut tx, albums).await?;
        if let Some(generation) = generation {
            upsert_config(&mut tx, GENERATION_KEY, &generation.to_string()).await?;
        }

        tx.commit().await?;

        info!(
            favorites = favorites.len(),
            generation = ?generation,
            "Library committed"
        );
        Ok(())
    }
}
