//! Share record and content grant repository implementation.

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use folio_core::error::{AppError, ErrorKind};
use folio_core::result::AppResult;
use folio_core::types::{ContentId, FolderId, OrgId};
use folio_entity::share::{AuthedContentCondition, AuthedContentRecord, SharedFolderRecord};

/// Repository for `shared_folder_records` and `authed_content_records`.
#[derive(Debug, Clone)]
pub struct ShareRepository {
    pool: PgPool,
}

impl ShareRepository {
    /// Create a new share repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Share records of the given folders.
    pub async fn find_by_folders(&self, folder_ids: &[FolderId]) -> AppResult<Vec<SharedFolderRecord>> {
        if folder_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, SharedFolderRecord>(
            "SELECT id, folder_id, org_id, creator, create_at FROM shared_folder_records \
             WHERE folder_id = ANY($1) ORDER BY create_at ASC",
        )
        .bind(folder_ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find share records", e))
    }

    /// Grants matching a condition.
    pub async fn find_authed(
        &self,
        condition: &AuthedContentCondition,
    ) -> AppResult<Vec<AuthedContentRecord>> {
        let mut builder = QueryBuilder::new(
            "SELECT id, org_id, content_id, from_folder_id, creator, create_at \
             FROM authed_content_records",
        );
        push_authed_condition(&mut builder, condition);
        builder.push(" ORDER BY create_at ASC");
        builder
            .build_query_as::<AuthedContentRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find grants", e))
    }

    /// Remove share records by `(folder, org)`.
    pub async fn delete_shares(conn: &mut PgConnection, pairs: &[(FolderId, OrgId)]) -> AppResult<()> {
        for (folder_id, org_id) in pairs {
            sqlx::query("DELETE FROM shared_folder_records WHERE folder_id = $1 AND org_id = $2")
                .bind(folder_id)
                .bind(org_id)
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to delete share record", e)
                })?;
        }
        Ok(())
    }

    /// Insert share records, keeping existing `(folder, org)` pairs.
    pub async fn insert_shares(conn: &mut PgConnection, records: &[SharedFolderRecord]) -> AppResult<()> {
        for record in records {
            sqlx::query(
                "INSERT INTO shared_folder_records (id, folder_id, org_id, creator, create_at) \
                 VALUES ($1, $2, $3, $4, $5) ON CONFLICT (folder_id, org_id) DO NOTHING",
            )
            .bind(record.id)
            .bind(record.folder_id)
            .bind(record.org_id)
            .bind(record.creator)
            .bind(record.create_at)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to insert share record", e)
            })?;
        }
        Ok(())
    }

    /// Delete grants matching a condition. Unrestricted conditions are refused.
    pub async fn revoke(conn: &mut PgConnection, condition: &AuthedContentCondition) -> AppResult<u64> {
        if condition.is_unrestricted() {
            return Err(AppError::database(
                "Refusing to revoke grants with an unrestricted condition",
            ));
        }
        let mut builder = QueryBuilder::new("DELETE FROM authed_content_records");
        push_authed_condition(&mut builder, condition);
        let result = builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to revoke grants", e))?;
        Ok(result.rows_affected())
    }

    /// Insert grants, keeping existing natural keys.
    pub async fn grant(conn: &mut PgConnection, records: &[AuthedContentRecord]) -> AppResult<()> {
        for record in records {
            sqlx::query(
                "INSERT INTO authed_content_records \
                 (id, org_id, content_id, from_folder_id, creator, create_at) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 ON CONFLICT (org_id, content_id, from_folder_id) DO NOTHING",
            )
            .bind(record.id)
            .bind(record.org_id)
            .bind(record.content_id)
            .bind(record.from_folder_id)
            .bind(record.creator)
            .bind(record.create_at)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert grant", e))?;
        }
        Ok(())
    }

    /// Point grants of `from` at `to`, dropping those that would duplicate.
    pub async fn retarget(conn: &mut PgConnection, from: ContentId, to: ContentId) -> AppResult<()> {
        sqlx::query(
            "DELETE FROM authed_content_records AS old \
             WHERE old.content_id = $1 AND EXISTS ( \
               SELECT 1 FROM authed_content_records AS cur \
               WHERE cur.content_id = $2 AND cur.org_id = old.org_id \
               AND cur.from_folder_id = old.from_folder_id)",
        )
        .bind(from)
        .bind(to)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to dedupe grants", e))?;

        sqlx::query("UPDATE authed_content_records SET content_id = $2 WHERE content_id = $1")
            .bind(from)
            .bind(to)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to retarget grants", e)
            })?;
        Ok(())
    }
}

fn push_authed_condition(
    builder: &mut QueryBuilder<'_, Postgres>,
    condition: &AuthedContentCondition,
) {
    builder.push(" WHERE TRUE");
    if !condition.org_ids.is_empty() {
        builder.push(" AND org_id = ANY(");
        builder.push_bind(condition.org_ids.clone());
        builder.push(")");
    }
    if !condition.content_ids.is_empty() {
        builder.push(" AND content_id = ANY(");
        builder.push_bind(condition.content_ids.clone());
        builder.push(")");
    }
    if !condition.from_folder_ids.is_empty() {
        builder.push(" AND from_folder_id = ANY(");
        builder.push_bind(condition.from_folder_ids.clone());
        builder.push(")");
    }
}
