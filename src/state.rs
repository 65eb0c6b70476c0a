use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::AppConfig;
use crate::realtime::ChannelRegistry;
use crate::storage::{Storage, StorageClient};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
    pub realtime: Arc<ChannelRegistry>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;
        info!("database pool ready");

        let storage = Storage::new(&config.storage).await?;

        Ok(Self {
            db,
            config: Arc::new(config),
            storage: Arc::new(storage),
            realtime: Arc::new(ChannelRegistry::new()),
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::{JwtConfig, StorageConfig};
    use crate::storage::StoredObject;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory stand-in for the S3 client.
    #[derive(Default)]
    pub struct FakeStorage {
        objects: Mutex<HashMap<String, Bytes>>,
    }

    impl FakeStorage {
        pub fn keys(&self) -> Vec<String> {
            self.objects.lock().unwrap().keys().cloned().collect()
        }
    }

    #[async_trait]
    impl StorageClient for FakeStorage {
        async fn put_object(
            &self,
            key: &str,
            body: Bytes,
            _content_type: &str,
        ) -> anyhow::Result<StoredObject> {
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), body);
            Ok(StoredObject {
                url: format!("http://fake/{key}"),
                key: key.to_string(),
            })
        }

        async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }

        async fn get_object(&self, key: &str) -> anyhow::Result<Bytes> {
            self.objects
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no such object: {key}"))
        }
    }

    impl AppState {
        /// State with a lazy pool and fake storage; nothing connects until a
        /// test actually issues a query.
        pub fn fake() -> Self {
            Self::fake_with_jwt("test-secret", "test-issuer", "test-audience")
        }

        /// State over a real (test) pool, with fake storage and a fresh
        /// registry.
        pub fn fake_with_db(db: PgPool) -> Self {
            let mut state = Self::fake();
            state.db = db;
            state
        }

        pub fn fake_with_jwt(secret: &str, issuer: &str, audience: &str) -> Self {
            let config = AppConfig {
                database_url: "postgres://localhost/eventpulse_test".into(),
                jwt: JwtConfig {
                    secret: secret.into(),
                    issuer: issuer.into(),
                    audience: audience.into(),
                    ttl_minutes: 60,
                    refresh_ttl_minutes: 60 * 24,
                },
                storage: StorageConfig {
                    endpoint: "http://localhost:9000".into(),
                    bucket: "test-bucket".into(),
                    access_key: "test".into(),
                    secret_key: "test".into(),
                    region: "us-east-1".into(),
                },
            };
            let db = PgPoolOptions::new()
                .connect_lazy(&config.database_url)
                .expect("lazy pool");
            Self {
                db,
                config: Arc::new(config),
                storage: Arc::new(FakeStorage::default()),
                realtime: Arc::new(ChannelRegistry::new()),
            }
        }
    }
}
