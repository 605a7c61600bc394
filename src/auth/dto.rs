use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::{
    claims::SessionClaims,
    repo_types::{Provider, Role, UserRecord},
};

/// Request body for user registration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
}

/// Request body for login. Missing keys arrive empty and are reported as missing fields.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Provider access token obtained by the client.
#[derive(Debug, Deserialize)]
pub struct OAuthRequest {
    #[serde(alias = "accessToken")]
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeRequest {
    #[serde(default)]
    pub current_password: Option<String>,
    pub new_password: String,
}

/// Response returned after register, login, oauth and profile update.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Response of the session refresh trigger.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub claims: SessionClaims,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub university: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
}

impl From<&UserRecord> for PublicUser {
    fn from(u: &UserRecord) -> Self {
        Self {
            id: u.id.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
            role: u.role,
            provider: Some(u.provider),
            image: u.profile_image_url.clone(),
            phone: u.phone.clone(),
            bio: u.bio.clone(),
            university: u.university.clone(),
            location: u.location.clone(),
            created_at: Some(u.created_at),
        }
    }
}

/// Minimal profile when the store has no record for a valid session.
impl From<&SessionClaims> for PublicUser {
    fn from(c: &SessionClaims) -> Self {
        Self {
            id: c.id.clone(),
            name: c.name.clone(),
            email: c.email.clone(),
            role: c.role,
            provider: None,
            image: c.picture.clone(),
            phone: c.phone.clone(),
            bio: c.bio.clone(),
            university: c.university.clone(),
            location: c.location.clone(),
            created_at: None,
        }
    }
}
