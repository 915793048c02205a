//! Artist views
//!
//! Artists have no table of their own. Names come from track tags and the
//! summaries are aggregated from the album and track tables on read.

use crate::error::Result;
use crate::models::{ArtistSummary, ArtistSummaryRow};
use crate::repositories::{Page, PageRequest};
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};

#[async_trait]
pub trait ArtistRepository: Send + Sync {
    /// Distinct track artists, ordered.
    async fn get_artists(&self) -> Result<Vec<String>>;

    async fn get_artists_paged(&self, page_request: PageRequest) -> Result<Page<String>>;

    /// One summary per album artist, ordered by name.
    async fn get_artist_summaries(&self) -> Result<Vec<ArtistSummary>>;

    async fn get_artist_summaries_paged(
        &self,
        page_request: PageRequest,
    ) -> Result<Page<ArtistSummary>>;
}

pub struct SqliteArtistRepository {
    pool: SqlitePool,
}

impl SqliteArtistRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const SUMMARY_SELECT: &str = r#"
    SELECT
        a.artist AS name,
        (SELECT COUNT(*) FROM albums WHERE albums.artist = a.artist) AS album_count,
        (SELECT COUNT(*) FROM tracks WHERE tracks.artist = a.artist) AS track_count,
        (SELECT thumbnail FROM albums WHERE albums.artist = a.artist ORDER BY name ASC LIMIT 1 OFFSET 0) AS thumbnail1,
        (SELECT thumbnail FROM albums WHERE albums.artist = a.artist ORDER BY name ASC LIMIT 1 OFFSET 1) AS thumbnail2,
        (SELECT thumbnail FROM albums WHERE albums.artist = a.artist ORDER BY name ASC LIMIT 1 OFFSET 2) AS thumbnail3
    FROM albums a
    GROUP BY a.artist
    ORDER BY a.artist ASC
"#;

#[async_trait]
impl ArtistRepository for SqliteArtistRepository {
    async fn get_artists(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT artist FROM tracks ORDER BY artist ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn get_artists_paged(&self, page_request: PageRequest) -> Result<Page<String>> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(DISTINCT artist) FROM tracks")
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT artist FROM tracks ORDER BY artist ASC LIMIT ? OFFSET ?",
        )
        .bind(page_request.limit() as i64)
        .bind(page_request.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(|(name,)| name).collect(),
            total.0 as u64,
            page_request,
        ))
    }

    async fn get_artist_summaries(&self) -> Result<Vec<ArtistSummary>> {
        let rows = query_as::<_, ArtistSummaryRow>(SUMMARY_SELECT)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ArtistSummary::from).collect())
    }

    async fn get_artist_summaries_paged(
        &self,
        page_request: PageRequest,
    ) -> Result<Page<ArtistSummary>> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(DISTINCT artist) FROM albums")
            .fetch_one(&self.pool)
            .await?;

        let rows = query_as::<_, ArtistSummaryRow>(&format!("{} LIMIT ? OFFSET ?", SUMMARY_SELECT))
            .bind(page_request.limit() as i64)
            .bind(page_request.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(
            rows.into_iter().map(ArtistSummary::from).collect(),
            total.0 as u64,
            page_request,
        ))
    }
}
