//! Content directory repository implementation.

use sqlx::{PgConnection, PgPool};

use folio_core::error::{AppError, ErrorKind};
use folio_core::result::AppResult;
use folio_core::types::ContentId;
use folio_entity::content::ContentInfo;
use folio_entity::folder::FolderPath;

/// Repository for the `contents` table.
#[derive(Debug, Clone)]
pub struct ContentRepository {
    pool: PgPool,
}

impl ContentRepository {
    /// Create a new content repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch contents by id.
    pub async fn find_by_ids(&self, ids: &[ContentId]) -> AppResult<Vec<ContentInfo>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, ContentInfo>(
            "SELECT id, name, org, content_type, sub_content_ids, source_id, latest_id, dir_path \
             FROM contents WHERE id = ANY($1)",
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find contents", e))
    }

    /// Batch update of content `dir_path` values.
    pub async fn update_paths(
        conn: &mut PgConnection,
        paths: &[(ContentId, FolderPath)],
    ) -> AppResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let ids: Vec<ContentId> = paths.iter().map(|(id, _)| *id).collect();
        let dirs: Vec<String> = paths.iter().map(|(_, p)| p.as_str().to_string()).collect();
        sqlx::query(
            "UPDATE contents AS c SET dir_path = v.dir_path \
             FROM UNNEST($1::uuid[], $2::text[]) AS v(id, dir_path) WHERE c.id = v.id",
        )
        .bind(ids)
        .bind(dirs)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update content paths", e)
        })?;
        Ok(())
    }
}
