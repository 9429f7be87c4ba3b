//! The assembled engine: every service wired over one store and one cache.

use std::sync::Arc;

use tracing::info;

use folio_cache::{CacheManager, LockCoordinator};
use folio_core::config::{AppConfig, LockConfig};
use folio_core::result::AppResult;
use folio_core::traits::cache::CacheProvider;
use folio_core::traits::directory::OrganizationDirectory;
use folio_database::{DatabasePool, Store};

use crate::content::ContentVersionResolver;
use crate::directory::StaticOrganizationDirectory;
use crate::folder::{FolderService, MoveService};
use crate::share::{AuthedContentService, AuthorizationPropagator, ShareService};

/// All Folio services, built once at start-up and shared by `Arc`.
#[derive(Debug, Clone)]
pub struct FolioEngine {
    /// Persistence.
    pub store: Arc<dyn Store>,
    /// Named-resource locks.
    pub locks: LockCoordinator,
    /// Organization directory used by sharing prechecks.
    pub directory: Arc<dyn OrganizationDirectory>,
    /// Content version resolution.
    pub resolver: ContentVersionResolver,
    /// Share-to-grant propagation.
    pub propagator: Arc<AuthorizationPropagator>,
    /// Folder CRUD and repair.
    pub folders: FolderService,
    /// Moves.
    pub mover: MoveService,
    /// Folder sharing.
    pub shares: ShareService,
    /// Direct content authorization.
    pub authed: AuthedContentService,
}

impl FolioEngine {
    /// Wire the services over existing backends.
    pub fn new(
        store: Arc<dyn Store>,
        cache: Arc<dyn CacheProvider>,
        directory: Arc<dyn OrganizationDirectory>,
        lock: LockConfig,
    ) -> Self {
        let locks = LockCoordinator::new(cache, lock);
        let resolver = ContentVersionResolver::new(Arc::clone(&store));
        let propagator = Arc::new(AuthorizationPropagator::new(
            Arc::clone(&store),
            resolver.clone(),
        ));

        let folders = FolderService::new(Arc::clone(&store), locks.clone(), Arc::clone(&propagator));
        let mover = MoveService::new(
            Arc::clone(&store),
            locks.clone(),
            Arc::clone(&propagator),
            folders.clone(),
        );
        let shares = ShareService::new(
            Arc::clone(&store),
            locks.clone(),
            Arc::clone(&directory),
            Arc::clone(&propagator),
        );
        let authed = AuthedContentService::new(
            Arc::clone(&store),
            locks.clone(),
            Arc::clone(&directory),
            Arc::clone(&propagator),
        );

        Self {
            store,
            locks,
            directory,
            resolver,
            propagator,
            folders,
            mover,
            shares,
            authed,
        }
    }

    /// Connect the database and cache named by `config` and wire the engine.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let pool = DatabasePool::connect(&config.database).await?;
        let cache = CacheManager::new(&config.cache).await?;
        let directory = StaticOrganizationDirectory::from_config(&config.sharing);

        info!(
            cache = %config.cache.provider,
            headquarters = config.sharing.headquarters.len(),
            "Folio engine initialized"
        );
        Ok(Self::new(
            Arc::new(pool.store()),
            Arc::new(cache),
            Arc::new(directory),
            config.lock.clone(),
        ))
    }
}
