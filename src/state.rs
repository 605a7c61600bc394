use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::auth::oauth::{HttpOAuthVerifier, OAuthVerifier};
use crate::auth::repo::{IdentityStore, JsonIdentityStore};
use crate::backend::{BackendClient, HttpBackend};
use crate::config::AppConfig;
use crate::posts::repo::PostStore;
use crate::storage::{Storage, StorageClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn IdentityStore>,
    pub posts: PostStore,
    pub oauth: Arc<dyn OAuthVerifier>,
    pub backend: Option<Arc<dyn BackendClient>>,
    pub storage: Option<Arc<dyn StorageClient>>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        tokio::fs::create_dir_all(&config.data_dir)
            .await
            .with_context(|| format!("create data dir {}", config.data_dir.display()))?;
        let users = Arc::new(JsonIdentityStore::in_dir(&config.data_dir)) as Arc<dyn IdentityStore>;
        let posts = PostStore::in_dir(&config.data_dir);

        let http = reqwest::Client::builder()
            .user_agent(concat!("roomhub/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        let oauth = Arc::new(HttpOAuthVerifier::new(http.clone())) as Arc<dyn OAuthVerifier>;
        let backend = config
            .backend_api_url
            .as_ref()
            .map(|url| Arc::new(HttpBackend::new(http.clone(), url.clone())) as Arc<dyn BackendClient>);

        // S3/MinIO, only when configured
        let storage = match &config.media {
            Some(media) => Some(Arc::new(Storage::new(media).await?) as Arc<dyn StorageClient>),
            None => None,
        };

        info!(
            data_dir = %config.data_dir.display(),
            backend = backend.is_some(),
            media = storage.is_some(),
            "application state ready"
        );

        Ok(Self::from_parts(config, users, posts, oauth, backend, storage))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn IdentityStore>,
        posts: PostStore,
        oauth: Arc<dyn OAuthVerifier>,
        backend: Option<Arc<dyn BackendClient>>,
        storage: Option<Arc<dyn StorageClient>>,
    ) -> Self {
        Self {
            config,
            users,
            posts,
            oauth,
            backend,
            storage,
        }
    }

    /// State over `data_dir` with in-process stand-ins for every remote collaborator.
    /// The fake OAuth provider accepts any access token that is itself an email.
    #[cfg(test)]
    pub fn fake(data_dir: &std::path::Path) -> Self {
        use crate::auth::{oauth::OAuthIdentity, repo_types::Provider};
        use crate::config::JwtConfig;
        use crate::error::AppError;
        use async_trait::async_trait;
        use bytes::Bytes;

        #[derive(Clone)]
        struct FakeStorage;
        #[async_trait]
        impl StorageClient for FakeStorage {
            async fn put_object(&self, _k: &str, _b: Bytes, _ct: &str) -> anyhow::Result<()> {
                Ok(())
            }
            fn public_url(&self, k: &str) -> String {
                format!("https://fake.local/{}", k)
            }
        }

        struct FakeOAuth;
        #[async_trait]
        impl OAuthVerifier for FakeOAuth {
            async fn fetch_identity(
                &self,
                provider: Provider,
                access_token: &str,
            ) -> Result<OAuthIdentity, AppError> {
                if !access_token.contains('@') {
                    return Err(AppError::Provider("token rejected".into()));
                }
                Ok(OAuthIdentity {
                    provider,
                    email: access_token.to_string(),
                    name: Some("OAuth User".into()),
                    image: Some("https://fake.local/avatar.png".into()),
                })
            }
        }

        let config = Arc::new(AppConfig {
            data_dir: data_dir.to_path_buf(),
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            backend_api_url: None,
            media: None,
        });

        Self::from_parts(
            config,
            Arc::new(JsonIdentityStore::in_dir(data_dir)),
            PostStore::in_dir(data_dir),
            Arc::new(FakeOAuth),
            None,
            Some(Arc::new(FakeStorage)),
        )
    }
}
