//! Organization directory contract consumed by folder sharing.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::OrgId;

/// Where a headquarters organization may share folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionScope {
    /// May share with any organization, including [`OrgId::ALL`].
    Global,
    /// May share only with the listed region members.
    Restricted(Vec<OrgId>),
}

impl RegionScope {
    /// Whether `org` is a legal share target under this scope.
    pub fn allows(&self, org: OrgId) -> bool {
        match self {
            Self::Global => true,
            Self::Restricted(members) => !org.is_all() && members.contains(&org),
        }
    }
}

/// External organization/school directory.
#[async_trait]
pub trait OrganizationDirectory: Send + Sync + std::fmt::Debug + 'static {
    /// The sharing scope of `org` if it is a headquarters, `None` otherwise.
    async fn headquarters(&self, org: OrgId) -> AppResult<Option<RegionScope>>;

    /// Organizations registered in the region of a headquarters.
    async fn region_members(&self, headquarters: OrgId) -> AppResult<Vec<OrgId>>;

    /// Existence check for a batch of organizations.
    async fn organizations_exist(&self, ids: &[OrgId]) -> AppResult<HashMap<OrgId, bool>>;
}
