//! Album repository trait and implementation

use crate::error::Result;
use crate::models::{Album, AlbumRow};
use crate::repositories::{Page, PageRequest};
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};

#[async_trait]
pub trait AlbumRepository: Send + Sync {
    /// All albums ordered by name.
    async fn get_albums(&self) -> Result<Vec<Album>>;

    async fn get_albums_paged(&self, page_request: PageRequest) -> Result<Page<Album>>;

    async fn get_album(&self, id: &str) -> Result<Option<Album>>;

    /// Albums credited to `artist`, ordered by name.
    async fn get_albums_by_artist(&self, artist: &str) -> Result<Vec<Album>>;

    async fn get_albums_by_artist_paged(
        &self,
        artist: &str,
        page_request: PageRequest,
    ) -> Result<Page<Album>>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqliteAlbumRepository {
    pool: SqlitePool,
}

impl SqliteAlbumRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn into_albums(rows: Vec<AlbumRow>) -> Vec<Album> {
    rows.into_iter().map(Album::from).collect()
}

#[async_trait]
impl AlbumRepository for SqliteAlbumRepository {
    async fn get_albums(&self) -> Result<Vec<Album>> {
        let rows = query_as::<_, AlbumRow>("SELECT * FROM albums ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(into_albums(rows))
    }

    async fn get_albums_paged(&self, page_request: PageRequest) -> Result<Page<Album>> {
        let total = self.count().await?;

        let rows =
            query_as::<_, AlbumRow>("SELECT * FROM albums ORDER BY name ASC, id ASC LIMIT ? OFFSET ?")
                .bind(page_request.limit() as i64)
                .bind(page_request.offset() as i64)
                .fetch_all(&self.pool)
                .await?;

        Ok(Page::new(into_albums(rows), total as u64, page_request))
    }

    async fn get_album(&self, id: &str) -> Result<Option<Album>> {
        let row = query_as::<_, AlbumRow>("SELECT * FROM albums WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Album::from))
    }

    async fn get_albums_by_artist(&self, artist: &str) -> Result<Vec<Album>> {
        let rows = query_as::<_, AlbumRow>("SELECT * FROM albums WHERE artist = ? ORDER BY name ASC")
            .bind(artist)
            .fetch_all(&self.pool)
            .await?;

        Ok(into_albums(rows))
    }

    async fn get_albums_by_artist_paged(
        &self,
        artist: &str,
        page_request: PageRequest,
    ) -> Result<Page<Album>> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM albums WHERE artist = ?")
            .bind(artist)
            .fetch_one(&self.pool)
            .await?;

        let rows = query_as::<_, AlbumRow>(
            "SELECT * FROM albums WHERE artist = ? ORDER BY name ASC LIMIT ? OFFSET ?",
        )
        .bind(artist)
        .bind(page_request.limit() as i64)
        .bind(page_request.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(into_albums(rows), total.0 as u64, page_request))
    }

    async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM albums")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::repositories::{LibraryCache, SqliteLibraryCache};

    async fn setup() -> SqliteAlbumRepository {
        let pool = create_test_pool().await.unwrap();
        SqliteLibraryCache::new(pool.clone())
            .replace_all_albums(&[
                Album::new("Rust in Peace", "Megadeth"),
                Album::new("Countdown to Extinction", "Megadeth"),
                Album::new("Reign in Blood", "Slayer"),
            ])
            .await
            .unwrap();
        SqliteAlbumRepository::new(pool)
    }

    #[tokio::test]
    async fn test_albums_ordered_by_name() {
        let repo = setup().await;
        let names: Vec<String> = repo
            .get_albums()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();

        assert_eq!(
            names,
            vec!["Countdown to Extinction", "Reign in Blood", "Rust in Peace"]
        );
    }

    #[tokio::test]
    async fn test_get_album_by_derived_id() {
        let repo = setup().await;

        let album = repo.get_album("Slayer|Reign in Blood").await.unwrap().unwrap();
        assert_eq!(album.artist, "Slayer");
        assert!(repo.get_album("Slayer|Seasons").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_albums_by_artist() {
        let repo = setup().await;

        let albums = repo.get_albums_by_artist("Megadeth").await.unwrap();
        assert_eq!(albums.len(), 2);
        assert_eq!(albums[0].name, "Countdown to Extinction");

        let page = repo
            .get_albums_by_artist_paged("Megadeth", PageRequest::new(0, 1))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert!(page.has_next());
    }

    #[tokio::test]
    async fn test_albums_paged() {
        let repo = setup().await;
        let page = repo.get_albums_paged(PageRequest::new(1, 2)).await.unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "Rust in Peace");
    }
}
