//! Application state - shared across all handlers.

use std::sync::Arc;

use yatube_core::ports::{
    Cache, CommentRepository, FollowRepository, GroupRepository, PasswordService,
    PostRepository, TokenService, UserRepository,
};
use yatube_infra::cache::InMemoryCache;
use yatube_infra::database::InMemoryDatabase;
use yatube_infra::{Argon2PasswordService, JwtConfig, JwtTokenService};

use crate::config::{AppConfig, ViewSettings};
use crate::templates::Templates;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub follows: Arc<dyn FollowRepository>,
    pub cache: Arc<dyn Cache>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    pub templates: Arc<Templates>,
    pub settings: Arc<ViewSettings>,
}

/// The five repositories, from whichever backend is configured.
struct Repositories {
    users: Arc<dyn UserRepository>,
    groups: Arc<dyn GroupRepository>,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    follows: Arc<dyn FollowRepository>,
}

impl Repositories {
    fn in_memory() -> Self {
        let db = InMemoryDatabase::new();
        Self {
            users: Arc::new(db.users()),
            groups: Arc::new(db.groups()),
            posts: Arc::new(db.posts()),
            comments: Arc::new(db.comments()),
            follows: Arc::new(db.follows()),
        }
    }

    #[cfg(feature = "postgres")]
    fn postgres(conn: yatube_infra::database::DbConn) -> Self {
        use yatube_infra::database::{
            PostgresCommentRepository, PostgresFollowRepository, PostgresGroupRepository,
            PostgresPostRepository, PostgresUserRepository,
        };

        Self {
            users: Arc::new(PostgresUserRepository::new(conn.clone())),
            groups: Arc::new(PostgresGroupRepository::new(conn.clone())),
            posts: Arc::new(PostgresPostRepository::new(conn.clone())),
            comments: Arc::new(PostgresCommentRepository::new(conn.clone())),
            follows: Arc::new(PostgresFollowRepository::new(conn)),
        }
    }
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Result<Self, tera::Error> {
        let templates = Templates::new(&config.views.template_dir)?;

        #[cfg(feature = "postgres")]
        let repos = match &config.database {
            Some(db_config) => match yatube_infra::database::connect(db_config).await {
                Ok(conn) => Repositories::postgres(conn),
                Err(e) => {
                    tracing::error!(
                        "Failed to connect to database: {}. Using in-memory fallback.",
                        e
                    );
                    Repositories::in_memory()
                }
            },
            None => {
                tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
                Repositories::in_memory()
            }
        };

        #[cfg(not(feature = "postgres"))]
        let repos = {
            tracing::info!("Running without postgres feature - using in-memory repositories");
            Repositories::in_memory()
        };

        let cache = Self::build_cache(config).await;

        tracing::info!("Application state initialized");

        Ok(Self::assemble(
            repos,
            cache,
            JwtTokenService::new(config.jwt.clone()),
            templates,
            config.views.clone(),
        ))
    }

    /// State backed entirely by memory.
    pub fn in_memory(
        jwt: JwtConfig,
        settings: ViewSettings,
    ) -> Result<Self, tera::Error> {
        let templates = Templates::new(&settings.template_dir)?;
        Ok(Self::assemble(
            Repositories::in_memory(),
            Arc::new(InMemoryCache::new()),
            JwtTokenService::new(jwt),
            templates,
            settings,
        ))
    }

    fn assemble(
        repos: Repositories,
        cache: Arc<dyn Cache>,
        tokens: JwtTokenService,
        templates: Templates,
        settings: ViewSettings,
    ) -> Self {
        Self {
            users: repos.users,
            groups: repos.groups,
            posts: repos.posts,
            comments: repos.comments,
            follows: repos.follows,
            cache,
            tokens: Arc::new(tokens),
            passwords: Arc::new(Argon2PasswordService::new()),
            templates: Arc::new(templates),
            settings: Arc::new(settings),
        }
    }

    #[cfg(feature = "redis")]
    async fn build_cache(config: &AppConfig) -> Arc<dyn Cache> {
        use yatube_infra::{RedisCache, RedisConfig};

        let Some(url) = config.redis_url.clone() else {
            return Arc::new(InMemoryCache::new());
        };

        match RedisCache::new(RedisConfig::from_env(url)).await {
            Ok(cache) => Arc::new(cache),
            Err(e) => {
                tracing::error!("Failed to connect to Redis: {}. Using in-memory cache.", e);
                Arc::new(InMemoryCache::new())
            }
        }
    }

    #[cfg(not(feature = "redis"))]
    async fn build_cache(config: &AppConfig) -> Arc<dyn Cache> {
        if config.redis_url.is_some() {
            tracing::warn!("REDIS_URL set but the redis feature is disabled; using in-memory cache");
        }
        Arc::new(InMemoryCache::new())
    }
}
