//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use yatube_core::pagination::POSTS_PER_PAGE;
use yatube_infra::JwtConfig;
use yatube_infra::database::DatabaseConfig;

/// How long the rendered index page stays cached.
pub const INDEX_CACHE_SECONDS: u64 = 20;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    pub redis_url: Option<String>,
    pub jwt: JwtConfig,
    pub views: ViewSettings,
}

/// Settings the views read on every request.
#[derive(Debug, Clone)]
pub struct ViewSettings {
    pub template_dir: String,
    pub posts_per_page: u64,
    pub index_cache_ttl: Duration,
    /// Mark the session cookie `Secure`.
    pub secure_cookies: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            template_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/templates").to_string(),
            posts_per_page: POSTS_PER_PAGE,
            index_cache_ttl: Duration::from_secs(INDEX_CACHE_SECONDS),
            secure_cookies: false,
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database = env::var("DATABASE_URL").ok().map(|url| {
            let mut config = DatabaseConfig::new(url);
            if let Some(max) = parsed("DB_MAX_CONNECTIONS") {
                config.max_connections = max;
            }
            if let Some(min) = parsed("DB_MIN_CONNECTIONS") {
                config.min_connections = min;
            }
            config
        });

        let defaults = ViewSettings::default();
        let views = ViewSettings {
            template_dir: env::var("TEMPLATE_DIR").unwrap_or(defaults.template_dir),
            posts_per_page: parsed("POSTS_PER_PAGE")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.posts_per_page),
            index_cache_ttl: parsed("INDEX_CACHE_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.index_cache_ttl),
            secure_cookies: env::var("SECURE_COOKIES")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.secure_cookies),
        };

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parsed("PORT").unwrap_or(8000),
            database,
            redis_url: env::var("REDIS_URL").ok(),
            jwt: JwtConfig::from_env(),
            views,
        }
    }
}
