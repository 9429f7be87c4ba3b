//! Configuration-backed organization directory.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use folio_core::config::SharingConfig;
use folio_core::result::AppResult;
use folio_core::traits::directory::{OrganizationDirectory, RegionScope};
use folio_core::types::OrgId;

/// Organization directory read from the `sharing` configuration section.
#[derive(Debug, Clone, Default)]
pub struct StaticOrganizationDirectory {
    known: HashSet<OrgId>,
    headquarters: HashMap<OrgId, RegionScope>,
}

impl StaticOrganizationDirectory {
    /// Build the directory from configuration.
    ///
    /// Headquarters and their region members count as known organizations
    /// even when they are not listed under `organizations`.
    pub fn from_config(config: &SharingConfig) -> Self {
        let mut known: HashSet<OrgId> = config.organizations.iter().copied().map(OrgId::from).collect();
        let mut headquarters = HashMap::new();

        for entry in &config.headquarters {
            let org = OrgId::from(entry.org_id);
            known.insert(org);
            let scope = if entry.global {
                RegionScope::Global
            } else {
                let members: Vec<OrgId> = entry.region_members.iter().copied().map(OrgId::from).collect();
                known.extend(members.iter().copied());
                RegionScope::Restricted(members)
            };
            headquarters.insert(org, scope);
        }

        Self {
            known,
            headquarters,
        }
    }

    /// Register an ordinary organization.
    pub fn with_organization(mut self, org: OrgId) -> Self {
        self.known.insert(org);
        self
    }

    /// Register a headquarters.
    pub fn with_headquarters(mut self, org: OrgId, scope: RegionScope) -> Self {
        self.known.insert(org);
        if let RegionScope::Restricted(members) = &scope {
            self.known.extend(members.iter().copied());
        }
        self.headquarters.insert(org, scope);
        self
    }
}

#[async_trait]
impl OrganizationDirectory for StaticOrganizationDirectory {
    async fn headquarters(&self, org: OrgId) -> AppResult<Option<RegionScope>> {
        Ok(self.headquarters.get(&org).cloned())
    }

    async fn region_members(&self, headquarters: OrgId) -> AppResult<Vec<OrgId>> {
        Ok(match self.headquarters.get(&headquarters) {
            Some(RegionScope::Restricted(members)) => members.clone(),
            Some(RegionScope::Global) => self.known.iter().copied().collect(),
            None => Vec::new(),
        })
    }

    async fn organizations_exist(&self, ids: &[OrgId]) -> AppResult<HashMap<OrgId, bool>> {
        Ok(ids.iter().map(|id| (*id, self.known.contains(id))).collect())
    }
}
