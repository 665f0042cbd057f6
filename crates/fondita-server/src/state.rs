//! Shared handler state and its wiring from configuration.

use fondita_application::{
    AdminCredentials, AuthService, MenuService, ReplicationJob, ReplicationScheduler,
    ReplicationSettings,
};
use fondita_core::clock::{Clock, SystemClock};
use fondita_core::config::RootConfig;
use fondita_core::error::Result;
use fondita_core::image::ImageStore;
use fondita_core::publish::PublishRepository;
use fondita_core::session::SessionStore;
use fondita_infrastructure::{
    FileSystemImageStore, FonditaPaths, GitSettings, GitWorkingTree, InMemorySessionStore,
    JsonMenuRepository, spawn_session_sweeper,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AppState {
    pub menu: MenuService,
    pub images: Arc<dyn ImageStore>,
    pub auth: AuthService,
    pub scheduler: ReplicationScheduler,
    pub paths: FonditaPaths,
    pub max_upload_bytes: u64,
}

impl AppState {
    /// Wires production components: git replication when enabled.
    pub async fn from_config(config: &RootConfig, cancel: CancellationToken) -> Result<Self> {
        let paths = FonditaPaths::new(&config.storage, &config.replication);
        let publish: Option<Arc<dyn PublishRepository>> = if config.replication.enabled {
            Some(Arc::new(GitWorkingTree::new(
                paths.working_tree().to_path_buf(),
                GitSettings::from(&config.replication),
            )))
        } else {
            None
        };
        Self::assemble(config, paths, publish, cancel).await
    }

    /// Same as [`AppState::from_config`] but publishing to `publish`.
    pub async fn with_publish_repository(
        config: &RootConfig,
        publish: Arc<dyn PublishRepository>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let paths = FonditaPaths::new(&config.storage, &config.replication);
        Self::assemble(config, paths, Some(publish), cancel).await
    }

    async fn assemble(
        config: &RootConfig,
        paths: FonditaPaths,
        publish: Option<Arc<dyn PublishRepository>>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let policy = config.session_policy();

        let repository = Arc::new(JsonMenuRepository::new(paths.menu_file().to_path_buf()));
        let images: Arc<dyn ImageStore> = Arc::new(
            FileSystemImageStore::new(paths.image_dir().to_path_buf(), config.upload_policy())
                .await?,
        );
        let menu = MenuService::new(repository.clone(), images.clone(), config.storage.week_days);

        let sessions: Arc<dyn SessionStore> =
            Arc::new(InMemorySessionStore::with_clock(policy, clock.clone()));
        let sweep_every = policy
            .sweep_interval
            .to_std()
            .unwrap_or(Duration::from_secs(300));
        spawn_session_sweeper(sessions.clone(), sweep_every, cancel.clone());
        tracing::warn!("Sessions are kept in memory; a restart signs every admin out");

        let auth = AuthService::new(
            sessions,
            AdminCredentials {
                username: config.auth.admin_user.clone(),
                password: config.auth.admin_pass.clone(),
            },
            policy,
            clock.clone(),
        );

        let scheduler = match publish {
            Some(publish) => {
                let settings =
                    ReplicationSettings::from_config(config, paths.public_dir().to_path_buf());
                let job = ReplicationJob::new(publish, repository, images.clone(), settings, clock);
                ReplicationScheduler::start(Arc::new(job), cancel)
            }
            None => {
                tracing::info!("Replication disabled");
                ReplicationScheduler::disabled()
            }
        };

        Ok(Self {
            menu,
            images,
            auth,
            scheduler,
            paths,
            max_upload_bytes: config.uploads.max_bytes,
        })
    }
}
