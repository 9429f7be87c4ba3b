//! Content rows as seen by the folder engine.
//!
//! Contents are authored elsewhere; the engine reads their type, owning
//! organization, plan composition and version chain, and only ever writes
//! their `dir_path`.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use folio_core::types::{ContentId, OrgId};

use crate::folder::path::FolderPath;

/// Kind of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "content_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// A single teaching material.
    Material,
    /// A lesson plan composed of other contents.
    Plan,
    /// A raw media asset; never shared through folders.
    Assets,
}

/// Capability of contents that reference other contents.
pub trait SubContents {
    /// Ids of the referenced contents; empty for non-composite kinds.
    fn sub_content_ids(&self) -> &[ContentId];

    /// Whether the content may be authorized to other organizations.
    fn shareable(&self) -> bool;
}

/// A content row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ContentInfo {
    /// Content id.
    pub id: ContentId,
    /// Display name.
    pub name: String,
    /// Owning organization.
    pub org: OrgId,
    /// Kind of content.
    pub content_type: ContentType,
    /// Contents referenced by a plan.
    pub sub_content_ids: Vec<ContentId>,
    /// Previous version, if any.
    pub source_id: Option<ContentId>,
    /// Head of the version chain this content belongs to.
    pub latest_id: ContentId,
    /// Where the content is filed.
    pub dir_path: FolderPath,
}

impl SubContents for ContentInfo {
    fn sub_content_ids(&self) -> &[ContentId] {
        match self.content_type {
            ContentType::Plan => &self.sub_content_ids,
            ContentType::Material | ContentType::Assets => &[],
        }
    }

    fn shareable(&self) -> bool {
        self.content_type != ContentType::Assets
    }
}
