//! Folder item repository implementation.

use std::collections::HashMap;

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use folio_core::error::{AppError, ErrorKind};
use folio_core::result::AppResult;
use folio_core::types::{FolderId, PageRequest, PageResponse};
use folio_entity::folder::{FolderCondition, FolderItem, FolderPath, escape_like};

use crate::changes::{ItemCountFix, PathRewrite};
use crate::store::ChildStats;

const FOLDER_COLUMNS: &str = "id, item_type, owner_type, owner, partition, parent_id, link, \
     dir_path, name, description, keywords, thumbnail, items_count, has_descendant, \
     creator, editor, create_at, update_at, delete_at";

/// Repository for folder item reads and transactional writes.
#[derive(Debug, Clone)]
pub struct FolderRepository {
    pool: PgPool,
}

impl FolderRepository {
    /// Create a new folder repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch live items by id.
    pub async fn find_by_ids(&self, ids: &[FolderId]) -> AppResult<Vec<FolderItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, FolderItem>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folder_items WHERE id = ANY($1) AND delete_at IS NULL"
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find folder items", e))
    }

    /// Search live items.
    pub async fn search(&self, condition: &FolderCondition) -> AppResult<Vec<FolderItem>> {
        let mut builder = QueryBuilder::new(format!("SELECT {FOLDER_COLUMNS} FROM folder_items"));
        push_condition(&mut builder, condition);
        builder.push(" ORDER BY item_type ASC, name ASC, id ASC");
        builder
            .build_query_as::<FolderItem>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to search folder items", e)
            })
    }

    /// Search live items, one page at a time.
    pub async fn search_page(
        &self,
        condition: &FolderCondition,
        page: &PageRequest,
    ) -> AppResult<PageResponse<FolderItem>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM folder_items");
        push_condition(&mut count, condition);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count folder items", e)
            })?;

        let mut builder = QueryBuilder::new(format!("SELECT {FOLDER_COLUMNS} FROM folder_items"));
        push_condition(&mut builder, condition);
        builder.push(" ORDER BY item_type ASC, name ASC, id ASC LIMIT ");
        builder.push_bind(page.limit() as i64);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset() as i64);
        let items = builder
            .build_query_as::<FolderItem>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to list folder items", e)
            })?;

        Ok(PageResponse::new(items, page, total as u64))
    }

    /// Live child counts and descendant flags.
    pub async fn child_stats(&self, folders: &[FolderItem]) -> AppResult<HashMap<FolderId, ChildStats>> {
        if folders.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<FolderId> = folders.iter().map(|f| f.id).collect();
        let paths: Vec<String> = folders
            .iter()
            .map(|f| f.children_path().as_str().to_string())
            .collect();
        let patterns: Vec<String> = folders
            .iter()
            .map(|f| f.children_path().descendants_pattern())
            .collect();

        let rows: Vec<(FolderId, i64, bool)> = sqlx::query_as(
            "SELECT f.id, \
             (SELECT COUNT(*) FROM folder_items c \
              WHERE c.parent_id = f.id AND c.delete_at IS NULL), \
             EXISTS (SELECT 1 FROM folder_items d \
              WHERE d.item_type = 'file' AND d.delete_at IS NULL \
              AND (d.dir_path = f.children_path OR d.dir_path LIKE f.pattern ESCAPE '\\')) \
             FROM UNNEST($1::uuid[], $2::text[], $3::text[]) AS f(id, children_path, pattern)",
        )
        .bind(&ids)
        .bind(&paths)
        .bind(&patterns)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count children", e))?;

        Ok(rows
            .into_iter()
            .map(|(id, items_count, has_descendant)| {
                (
                    id,
                    ChildStats {
                        items_count: items_count as i32,
                        has_descendant,
                    },
                )
            })
            .collect())
    }

    /// Insert new items.
    pub async fn insert(conn: &mut PgConnection, items: &[FolderItem]) -> AppResult<()> {
        for item in items {
            sqlx::query(&format!(
                "INSERT INTO folder_items ({FOLDER_COLUMNS}) VALUES \
                 ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)"
            ))
            .bind(item.id)
            .bind(item.item_type)
            .bind(item.owner_type)
            .bind(item.owner)
            .bind(item.partition)
            .bind(item.parent_id)
            .bind(item.link)
            .bind(&item.dir_path)
            .bind(&item.name)
            .bind(&item.description)
            .bind(&item.keywords)
            .bind(&item.thumbnail)
            .bind(item.items_count)
            .bind(item.has_descendant)
            .bind(item.creator)
            .bind(item.editor)
            .bind(item.create_at)
            .bind(item.update_at)
            .bind(item.delete_at)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to insert folder item", e)
            })?;
        }
        Ok(())
    }

    /// Overwrite the mutable columns of existing items.
    pub async fn update(conn: &mut PgConnection, items: &[FolderItem]) -> AppResult<()> {
        for item in items {
            let result = sqlx::query(
                "UPDATE folder_items SET parent_id = $2, dir_path = $3, name = $4, \
                 description = $5, keywords = $6, thumbnail = $7, editor = $8, update_at = $9 \
                 WHERE id = $1 AND delete_at IS NULL",
            )
            .bind(item.id)
            .bind(item.parent_id)
            .bind(&item.dir_path)
            .bind(&item.name)
            .bind(&item.description)
            .bind(&item.keywords)
            .bind(&item.thumbnail)
            .bind(item.editor)
            .bind(item.update_at)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update folder item", e)
            })?;
            if result.rows_affected() == 0 {
                return Err(AppError::database(format!(
                    "Cannot update missing folder item {}",
                    item.id
                )));
            }
        }
        Ok(())
    }

    /// Batch prefix replace of `dir_path`.
    ///
    /// The root path never takes part in a plain string splice: a root
    /// `from` prepends `to`, a root `to` strips `from`.
    pub async fn rewrite_paths(conn: &mut PgConnection, rewrite: &PathRewrite) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE folder_items SET update_at = NOW(), dir_path = CASE \
               WHEN dir_path = $1 THEN $2 \
               WHEN $1 = '/' THEN (CASE WHEN $2 = '/' THEN dir_path ELSE $2 || dir_path END) \
               WHEN $2 = '/' THEN substr(dir_path, char_length($1) + 1) \
               ELSE $2 || substr(dir_path, char_length($1) + 1) END \
             WHERE dir_path = $1 OR dir_path LIKE $3 ESCAPE '\\'",
        )
        .bind(rewrite.from.as_str())
        .bind(rewrite.to.as_str())
        .bind(rewrite.from.descendants_pattern())
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to rewrite paths", e))?;
        Ok(result.rows_affected())
    }

    /// Batch write of repaired item counts.
    pub async fn update_counts(conn: &mut PgConnection, fixes: &[ItemCountFix]) -> AppResult<()> {
        if fixes.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = fixes.iter().map(|f| f.id.into_uuid()).collect();
        let counts: Vec<i32> = fixes.iter().map(|f| f.items_count).collect();
        let flags: Vec<bool> = fixes.iter().map(|f| f.has_descendant).collect();
        sqlx::query(
            "UPDATE folder_items AS f SET items_count = v.items_count, \
             has_descendant = v.has_descendant \
             FROM UNNEST($1::uuid[], $2::int4[], $3::bool[]) AS v(id, items_count, has_descendant) \
             WHERE f.id = v.id",
        )
        .bind(ids)
        .bind(counts)
        .bind(flags)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to repair counts", e))?;
        Ok(())
    }

    /// Soft-delete items.
    pub async fn soft_delete(conn: &mut PgConnection, ids: &[FolderId]) -> AppResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query("UPDATE folder_items SET delete_at = NOW() WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete folder items", e)
            })?;
        Ok(())
    }
}

fn push_condition(builder: &mut QueryBuilder<'_, Postgres>, condition: &FolderCondition) {
    builder.push(" WHERE delete_at IS NULL");
    if !condition.ids.is_empty() {
        builder.push(" AND id = ANY(");
        builder.push_bind(condition.ids.clone());
        builder.push(")");
    }
    if let Some(parent_id) = condition.parent_id {
        builder.push(" AND parent_id = ");
        builder.push_bind(parent_id);
    }
    if let Some(name) = &condition.name {
        builder.push(" AND name = ");
        builder.push_bind(name.clone());
    }
    if let Some(fragment) = &condition.name_like {
        builder.push(" AND name LIKE ");
        builder.push_bind(format!("%{}%", escape_like(fragment)));
        builder.push(" ESCAPE '\\'");
    }
    if let Some(owner_type) = condition.owner_type {
        builder.push(" AND owner_type = ");
        builder.push_bind(owner_type);
    }
    if let Some(owner) = condition.owner {
        builder.push(" AND owner = ");
        builder.push_bind(owner);
    }
    if let Some(partition) = condition.partition {
        builder.push(" AND partition = ");
        builder.push_bind(partition);
    }
    if let Some(item_type) = condition.item_type {
        builder.push(" AND item_type = ");
        builder.push_bind(item_type);
    }
    if let Some(dir_path) = &condition.dir_path {
        builder.push(" AND dir_path = ");
        builder.push_bind(dir_path.clone());
    }
    if let Some(under) = &condition.under_path {
        push_under(builder, under);
    }
    if !condition.links.is_empty() {
        builder.push(" AND link = ANY(");
        builder.push_bind(condition.links.clone());
        builder.push(")");
    }
}

fn push_under(builder: &mut QueryBuilder<'_, Postgres>, path: &FolderPath) {
    if path.is_root() {
        return;
    }
    builder.push(" AND (dir_path = ");
    builder.push_bind(path.clone());
    builder.push(" OR dir_path LIKE ");
    builder.push_bind(path.descendants_pattern());
    builder.push(" ESCAPE '\\')");
}
