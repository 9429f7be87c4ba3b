//! Organization directory configuration used by folder sharing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Static organization directory.
///
/// Deployments that do not run an external organization service describe
/// the known organizations and headquarters here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SharingConfig {
    /// Every organization that may receive a share.
    #[serde(default)]
    pub organizations: Vec<Uuid>,
    /// Organizations allowed to share folders.
    #[serde(default)]
    pub headquarters: Vec<HeadquartersEntry>,
}

/// A headquarters organization and the region it may share into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadquartersEntry {
    /// The headquarters organization.
    pub org_id: Uuid,
    /// Global headquarters may share with any organization.
    #[serde(default)]
    pub global: bool,
    /// Organizations inside a restricted headquarters' region.
    #[serde(default)]
    pub region_members: Vec<Uuid>,
}
