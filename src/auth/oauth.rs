//! Provider access token → verified `{email, name, image}`.
//!
//! The authorization-code redirect happens on the client; this side only
//! exchanges the resulting access token at the provider's user-info endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::auth::repo_types::{normalize_email, Provider};
use crate::error::AppError;

const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const FACEBOOK_ME_URL: &str = "https://graph.facebook.com/me";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthIdentity {
    pub provider: Provider,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

#[async_trait]
pub trait OAuthVerifier: Send + Sync {
    async fn fetch_identity(
        &self,
        provider: Provider,
        access_token: &str,
    ) -> Result<OAuthIdentity, AppError>;
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FacebookMe {
    email: Option<String>,
    name: Option<String>,
    picture: Option<FacebookPicture>,
}

#[derive(Debug, Deserialize)]
struct FacebookPicture {
    data: Option<FacebookPictureData>,
}

#[derive(Debug, Deserialize)]
struct FacebookPictureData {
    url: Option<String>,
}

fn require_email(provider: Provider, email: Option<String>) -> Result<String, AppError> {
    email
        .map(|e| normalize_email(&e))
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::Provider(format!("{} did not return an email", provider)))
}

impl GoogleUserInfo {
    fn into_identity(self) -> Result<OAuthIdentity, AppError> {
        if self.email_verified == Some(false) {
            return Err(AppError::Provider("google email is not verified".into()));
        }
        Ok(OAuthIdentity {
            provider: Provider::Google,
            email: require_email(Provider::Google, self.email)?,
            name: self.name,
            image: self.picture,
        })
    }
}

impl FacebookMe {
    fn into_identity(self) -> Result<OAuthIdentity, AppError> {
        Ok(OAuthIdentity {
            provider: Provider::Facebook,
            email: require_email(Provider::Facebook, self.email)?,
            name: self.name,
            image: self.picture.and_then(|p| p.data).and_then(|d| d.url),
        })
    }
}

/// Calls the real provider endpoints.
#[derive(Clone)]
pub struct HttpOAuthVerifier {
    client: reqwest::Client,
}

impl HttpOAuthVerifier {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        provider: Provider,
        req: reqwest::RequestBuilder,
    ) -> Result<T, AppError> {
        let res = req.send().await.map_err(|e| {
            AppError::Provider(format!("{} request failed: {}", provider, e))
        })?;
        let status = res.status();
        if !status.is_success() {
            warn!(%provider, %status, "provider rejected access token");
            return Err(AppError::Provider(format!(
                "{} rejected the access token ({})",
                provider, status
            )));
        }
        res.json::<T>()
            .await
            .map_err(|e| AppError::Provider(format!("{} returned malformed profile: {}", provider, e)))
    }
}

#[async_trait]
impl OAuthVerifier for HttpOAuthVerifier {
    async fn fetch_identity(
        &self,
        provider: Provider,
        access_token: &str,
    ) -> Result<OAuthIdentity, AppError> {
        let identity = match provider {
            Provider::Google => {
                let req = self
                    .client
                    .get(GOOGLE_USERINFO_URL)
                    .bearer_auth(access_token);
                self.get_json::<GoogleUserInfo>(provider, req)
                    .await?
                    .into_identity()?
            }
            Provider::Facebook => {
                let req = self.client.get(FACEBOOK_ME_URL).query(&[
                    ("fields", "id,name,email,picture.type(large)"),
                    ("access_token", access_token),
                ]);
                self.get_json::<FacebookMe>(provider, req)
                    .await?
                    .into_identity()?
            }
            Provider::Credentials => {
                return Err(AppError::Validation(
                    "credentials is not an OAuth provider".into(),
                ))
            }
        };
        debug!(%provider, email = %identity.email, "oauth identity verified");
        Ok(identity)
    }
}
