//! Track repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{Track, TrackQueueItem};
use crate::repositories::{Page, PageRequest};
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};

/// Default batch size for keyset queue pagination.
pub const QUEUE_BATCH_SIZE: u32 = 100;

/// Read access to tracks plus the favorite flag, the one field users own.
#[async_trait]
pub trait TrackRepository: Send + Sync {
    /// All tracks ordered by artist, album, disc and track number.
    async fn get_tracks(&self) -> Result<Vec<Track>>;

    /// Tracks ordered by title.
    async fn get_tracks_paged(&self, page_request: PageRequest) -> Result<Page<Track>>;

    async fn get_track(&self, id: i64) -> Result<Option<Track>>;

    /// Tracks of one album ordered by disc and track number.
    async fn get_tracks_by_album(&self, album_id: &str) -> Result<Vec<Track>>;

    async fn get_tracks_by_album_paged(
        &self,
        album_id: &str,
        page_request: PageRequest,
    ) -> Result<Page<Track>>;

    /// Queue entries for the whole library, in [`get_tracks`](Self::get_tracks) order.
    async fn get_queue_items(&self) -> Result<Vec<TrackQueueItem>>;

    /// Queue entries for one album, in disc/track order.
    async fn get_album_queue_items(&self, album_id: &str) -> Result<Vec<TrackQueueItem>>;

    /// Keyset page of queue entries ordered by `(title, id)`, strictly after
    /// the given position.
    async fn get_queue_items_after(
        &self,
        title: &str,
        id: i64,
        limit: u32,
    ) -> Result<Vec<TrackQueueItem>>;

    async fn get_favorites(&self) -> Result<Vec<Track>>;

    /// # Errors
    /// `LibraryError::NotFound` if no track has this id.
    async fn set_favorite(&self, id: i64, is_favorite: bool) -> Result<()>;

    /// Flip the favorite flag and return the new value.
    ///
    /// # Errors
    /// `LibraryError::NotFound` if no track has this id.
    async fn toggle_favorite(&self, id: i64) -> Result<bool>;

    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of TrackRepository
pub struct SqliteTrackRepository {
    pool: SqlitePool,
}

impl SqliteTrackRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const LIBRARY_ORDER: &str = "ORDER BY artist ASC, album ASC, disc_number ASC, track_number ASC";
const ALBUM_ORDER: &str = "ORDER BY disc_number ASC, track_number ASC";

#[async_trait]
impl TrackRepository for SqliteTrackRepository {
    async fn get_tracks(&self) -> Result<Vec<Track>> {
        let tracks = query_as::<_, Track>(&format!("SELECT * FROM tracks {}", LIBRARY_ORDER))
            .fetch_all(&self.pool)
            .await?;

        Ok(tracks)
    }

    async fn get_tracks_paged(&self, page_request: PageRequest) -> Result<Page<Track>> {
        let total = self.count().await?;

        let tracks =
            query_as::<_, Track>("SELECT * FROM tracks ORDER BY title ASC, id ASC LIMIT ? OFFSET ?")
                .bind(page_request.limit() as i64)
                .bind(page_request.offset() as i64)
                .fetch_all(&self.pool)
                .await?;

        Ok(Page::new(tracks, total as u64, page_request))
    }

    async fn get_track(&self, id: i64) -> Result<Option<Track>> {
        let track = query_as::<_, Track>("SELECT * FROM tracks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(track)
    }

    async fn get_tracks_by_album(&self, album_id: &str) -> Result<Vec<Track>> {
        let tracks = query_as::<_, Track>(&format!(
            "SELECT * FROM tracks WHERE album_id = ? {}",
            ALBUM_ORDER
        ))
        .bind(album_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tracks)
    }

    async fn get_tracks_by_album_paged(
        &self,
        album_id: &str,
        page_request: PageRequest,
    ) -> Result<Page<Track>> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tracks WHERE album_id = ?")
            .bind(album_id)
            .fetch_one(&self.pool)
            .await?;

        let tracks = query_as::<_, Track>(&format!(
            "SELECT * FROM tracks WHERE album_id = ? {} LIMIT ? OFFSET ?",
            ALBUM_ORDER
        ))
        .bind(album_id)
        .bind(page_request.limit() as i64)
        .bind(page_request.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(tracks, total.0 as u64, page_request))
    }

    async fn get_queue_items(&self) -> Result<Vec<TrackQueueItem>> {
        let items = query_as::<_, TrackQueueItem>(&format!(
            "SELECT id, title, artist, album, uri FROM tracks {}",
            LIBRARY_ORDER
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn get_album_queue_items(&self, album_id: &str) -> Result<Vec<TrackQueueItem>> {
        let items = query_as::<_, TrackQueueItem>(&format!(
            "SELECT id, title, artist, album, uri FROM tracks WHERE album_id = ? {}",
            ALBUM_ORDER
        ))
        .bind(album_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn get_queue_items_after(
        &self,
        title: &str,
        id: i64,
        limit: u32,
    ) -> Result<Vec<TrackQueueItem>> {
        let items = query_as::<_, TrackQueueItem>(
            r#"
            SELECT id, title, artist, album, uri FROM tracks
            WHERE title > ? OR (title = ? AND id > ?)
            ORDER BY title ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(title)
        .bind(title)
        .bind(id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn get_favorites(&self) -> Result<Vec<Track>> {
        let tracks = query_as::<_, Track>(&format!(
            "SELECT * FROM tracks WHERE is_favorite = 1 {}",
            LIBRARY_ORDER
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(tracks)
    }

    async fn set_favorite(&self, id: i64, is_favorite: bool) -> Result<()> {
        let result = sqlx::query("UPDATE tracks SET is_favorite = ? WHERE id = ?")
            .bind(is_favorite)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::not_found("Track", id));
        }

        Ok(())
    }

    async fn toggle_favorite(&self, id: i64) -> Result<bool> {
        let updated: Option<(bool,)> = sqlx::query_as(
            "UPDATE tracks SET is_favorite = NOT is_favorite WHERE id = ? RETURNING is_favorite",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        updated
            .map(|(is_favorite,)| is_favorite)
            .ok_or_else(|| LibraryError::not_found("Track", id))
    }

    async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tracks")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::repositories::cache::tests::track;
    use crate::repositories::{LibraryCache, SqliteLibraryCache};

    async fn setup() -> SqliteTrackRepository {
        let pool = create_test_pool().await.unwrap();
        let mut disc_two = track(4, "Dawn Patrol", "Megadeth", "Rust in Peace");
        disc_two.disc_number = 2;
        disc_two.track_number = 1;

        SqliteLibraryCache::new(pool.clone())
            .replace_all_tracks(&[
                track(3, "Tornado of Souls", "Megadeth", "Rust in Peace"),
                track(1, "Holy Wars", "Megadeth", "Rust in Peace"),
                disc_two,
                track(2, "Angel of Death", "Slayer", "Reign in Blood"),
            ])
            .await
            .unwrap();

        SqliteTrackRepository::new(pool)
    }

    #[tokio::test]
    async fn test_library_order() {
        let repo = setup().await;
        let ids: Vec<i64> = repo.get_tracks().await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3, 4, 2]);

        let queue: Vec<i64> = repo
            .get_queue_items()
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(queue, ids);
    }

    #[tokio::test]
    async fn test_album_order_and_paging() {
        let repo = setup().await;
        let album = crate::models::album_id("Megadeth", "Rust in Peace");

        let titles: Vec<String> = repo
            .get_tracks_by_album(&album)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["Holy Wars", "Tornado of Souls", "Dawn Patrol"]);

        let page = repo
            .get_tracks_by_album_paged(&album, PageRequest::new(1, 2))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "Dawn Patrol");
    }

    #[tokio::test]
    async fn test_paged_by_title() {
        let repo = setup().await;
        let page = repo.get_tracks_paged(PageRequest::new(0, 2)).await.unwrap();

        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items[0].title, "Angel of Death");
        assert_eq!(page.items[1].title, "Dawn Patrol");
    }

    #[tokio::test]
    async fn test_queue_keyset_pagination() {
        let repo = setup().await;

        let first = repo.get_queue_items_after("", i64::MIN, 2).await.unwrap();
        assert_eq!(first.len(), 2);

        let last = first.last().unwrap();
        let rest = repo
            .get_queue_items_after(&last.title, last.id, QUEUE_BATCH_SIZE)
            .await
            .unwrap();
        let titles: Vec<&str> = rest.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Holy Wars", "Tornado of Souls"]);
    }

    #[tokio::test]
    async fn test_favorites() {
        let repo = setup().await;

        repo.set_favorite(2, true).await.unwrap();
        assert!(repo.get_track(2).await.unwrap().unwrap().is_favorite);

        assert!(!repo.toggle_favorite(2).await.unwrap());
        assert!(repo.toggle_favorite(1).await.unwrap());

        let favorites: Vec<i64> = repo.get_favorites().await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(favorites, vec![1]);
    }

    #[tokio::test]
    async fn test_unknown_track() {
        let repo = setup().await;

        assert!(repo.get_track(999).await.unwrap().is_none());
        assert!(matches!(
            repo.set_favorite(999, true).await,
            Err(LibraryError::NotFound { .. })
        ));
        assert!(matches!(
            repo.toggle_favorite(999).await,
            Err(LibraryError::NotFound { .. })
        ));
    }
}
