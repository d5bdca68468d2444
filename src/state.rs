use std::sync::Arc;

use crate::auth::jwt::JwtKeys;
use crate::config::AppConfig;
use crate::github::{GithubClient, RepoLookup};
use crate::store::{MemoryStore, PgStore, ProfileStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub github: Arc<dyn RepoLookup>,
    pub jwt: JwtKeys,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let (users, profiles): (Arc<dyn UserStore>, Arc<dyn ProfileStore>) =
            match config.database_url.as_deref() {
                Some(url) => {
                    let store = Arc::new(PgStore::connect(url).await?);
                    tracing::info!("using postgres store");
                    (store.clone() as Arc<dyn UserStore>, store as Arc<dyn ProfileStore>)
                }
                None => {
                    tracing::warn!("DATABASE_URL not set; data is kept in memory only");
                    let store = Arc::new(MemoryStore::new());
                    (store.clone() as Arc<dyn UserStore>, store as Arc<dyn ProfileStore>)
                }
            };

        let github = Arc::new(GithubClient::new(&config.github)?) as Arc<dyn RepoLookup>;

        Ok(Self::from_parts(&config, users, profiles, github))
    }

    pub fn from_parts(
        config: &AppConfig,
        users: Arc<dyn UserStore>,
        profiles: Arc<dyn ProfileStore>,
        github: Arc<dyn RepoLookup>,
    ) -> Self {
        let jwt = JwtKeys::new(&config.jwt);
        Self {
            users,
            profiles,
            github,
            jwt,
        }
    }

    /// Memory-backed state with a canned GitHub lookup.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{GithubConfig, JwtConfig};
        use crate::github::fake::FakeGithub;

        let config = AppConfig {
            database_url: None,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            github: GithubConfig {
                api_url: "http://github.invalid".into(),
                client_id: None,
                client_secret: None,
                timeout_secs: 1,
            },
        };
        let store = Arc::new(MemoryStore::new());
        Self::from_parts(&config, store.clone(), store, Arc::new(FakeGithub))
    }
}
