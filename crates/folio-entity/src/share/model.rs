//! Share and authorization record models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use folio_core::types::{AuthedRecordId, ContentId, FolderId, OrgId, SharedRecordId, UserId};

/// A folder explicitly shared with an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SharedFolderRecord {
    /// Unique record identifier.
    pub id: SharedRecordId,
    /// The shared folder.
    pub folder_id: FolderId,
    /// Receiving organization, or [`OrgId::ALL`].
    pub org_id: OrgId,
    /// User who shared the folder.
    pub creator: UserId,
    /// When the share was created.
    pub create_at: DateTime<Utc>,
}

impl SharedFolderRecord {
    /// Build a new share record.
    pub fn new(folder_id: FolderId, org_id: OrgId, creator: UserId) -> Self {
        Self {
            id: SharedRecordId::new(),
            folder_id,
            org_id,
            creator,
            create_at: Utc::now(),
        }
    }
}

/// A grant letting an organization view and reuse a content item.
///
/// `from_folder_id` names the shared folder that caused the grant so that
/// revoking one folder's share never removes a grant caused by another.
/// Direct grants carry [`FolderId::ROOT`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AuthedContentRecord {
    /// Unique record identifier.
    pub id: AuthedRecordId,
    /// Authorized organization.
    pub org_id: OrgId,
    /// Latest-version id of the authorized content.
    pub content_id: ContentId,
    /// Shared folder the grant derives from.
    pub from_folder_id: FolderId,
    /// User whose action created the grant.
    pub creator: UserId,
    /// When the grant was created.
    pub create_at: DateTime<Utc>,
}

impl AuthedContentRecord {
    /// Build a new grant.
    pub fn new(
        org_id: OrgId,
        content_id: ContentId,
        from_folder_id: FolderId,
        creator: UserId,
    ) -> Self {
        Self {
            id: AuthedRecordId::new(),
            org_id,
            content_id,
            from_folder_id,
            creator,
            create_at: Utc::now(),
        }
    }

    /// The natural key of a grant.
    pub fn key(&self) -> (OrgId, ContentId, FolderId) {
        (self.org_id, self.content_id, self.from_folder_id)
    }
}

/// Filter over grants; empty lists do not restrict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthedContentCondition {
    /// Authorized organizations.
    pub org_ids: Vec<OrgId>,
    /// Authorized contents.
    pub content_ids: Vec<ContentId>,
    /// Originating folders.
    pub from_folder_ids: Vec<FolderId>,
}

impl AuthedContentCondition {
    /// Whether the condition selects every grant.
    pub fn is_unrestricted(&self) -> bool {
        self.org_ids.is_empty() && self.content_ids.is_empty() && self.from_folder_ids.is_empty()
    }

    /// In-process evaluation, mirroring the SQL filter of the Postgres store.
    pub fn matches(&self, record: &AuthedContentRecord) -> bool {
        (self.org_ids.is_empty() || self.org_ids.contains(&record.org_id))
            && (self.content_ids.is_empty() || self.content_ids.contains(&record.content_id))
            && (self.from_folder_ids.is_empty()
                || self.from_folder_ids.contains(&record.from_folder_id))
    }
}
