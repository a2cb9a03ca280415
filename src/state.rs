use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::auth::session::{SessionCodec, SessionKeys};
use crate::config::{AppConfig, StoreBackend};
use crate::store::{ArticleStore, MemoryStore, PgStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub articles: Arc<dyn ArticleStore>,
    pub session: Arc<SessionCodec>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let (users, articles): (Arc<dyn UserStore>, Arc<dyn ArticleStore>) =
            match config.store_backend {
                StoreBackend::Postgres => {
                    let store = Arc::new(PgStore::connect(&config).await?);
                    (store.clone(), store)
                }
                StoreBackend::Memory => {
                    info!("using in-memory store; data is lost on restart");
                    let store = Arc::new(MemoryStore::new());
                    (store.clone(), store)
                }
            };

        // New keys on every start: restarting logs everyone out.
        let session = Arc::new(SessionCodec::new(
            &SessionKeys::generate(),
            config.session.max_age_secs,
        ));

        Ok(Self {
            users,
            articles,
            session,
            config: Arc::new(config),
        })
    }

    pub fn store_timeout(&self) -> Duration {
        self.config.store_timeout
    }

    /// In-memory store and fixed session keys.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::SessionConfig;

        let store = Arc::new(MemoryStore::new());
        let config = AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            store_backend: StoreBackend::Memory,
            database_url: None,
            db_max_connections: 1,
            store_timeout: Duration::from_secs(2),
            session: SessionConfig {
                max_age_secs: 3600,
                secure_cookie: false,
            },
        };
        let session = Arc::new(SessionCodec::new(
            &SessionKeys::from_bytes([11u8; 64], [13u8; 32]),
            config.session.max_age_secs,
        ));
        Self {
            users: store.clone(),
            articles: store,
            session,
            config: Arc::new(config),
        }
    }
}
