use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Marketplace role, fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Student,
    Agent,
    Owner,
    ServiceProvider,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Student, Role::Agent, Role::Owner, Role::ServiceProvider];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Agent => "agent",
            Role::Owner => "owner",
            Role::ServiceProvider => "service-provider",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| format!("Unknown role: {}", s.trim()))
    }
}

/// Where an identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Credentials,
    Google,
    Facebook,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Credentials => "credentials",
            Provider::Google => "google",
            Provider::Facebook => "facebook",
        }
    }

    pub fn is_oauth(&self) -> bool {
        !matches!(self, Provider::Credentials)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "credentials" => Ok(Provider::Credentials),
            "google" => Ok(Provider::Google),
            "facebook" => Ok(Provider::Facebook),
            other => Err(format!("Unknown provider: {}", other)),
        }
    }
}

/// Trim and lowercase an email for storage and comparison.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Persisted identity entry in `users.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "password", default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>, // PHC string; absent for pure OAuth accounts
    pub role: Role,
    #[serde(default)]
    pub provider: Provider,
    #[serde(rename = "image", default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub university: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<OffsetDateTime>,
}

impl UserRecord {
    pub fn has_password(&self) -> bool {
        self.password_hash.as_deref().is_some_and(|h| !h.is_empty())
    }

    pub fn matches_email(&self, normalized: &str) -> bool {
        normalize_email(&self.email) == normalized
    }
}

/// A record before the store assigns `id` and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub provider: Provider,
    pub profile_image_url: Option<String>,
}

/// Partial update. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub profile_image_url: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub university: Option<String>,
    pub location: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        *self == UserPatch::default()
    }

    pub fn apply(self, record: &mut UserRecord) {
        if let Some(v) = self.name {
            record.name = v;
        }
        if let Some(v) = self.password_hash {
            record.password_hash = Some(v);
        }
        if let Some(v) = self.profile_image_url {
            record.profile_image_url = Some(v);
        }
        if let Some(v) = self.phone {
            record.phone = Some(v);
        }
        if let Some(v) = self.bio {
            record.bio = Some(v);
        }
        if let Some(v) = self.university {
            record.university = Some(v);
        }
        if let Some(v) = self.location {
            record.location = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_known_values_only() {
        assert_eq!("student".parse::<Role>(), Ok(Role::Student));
        assert_eq!(" Service-Provider ".parse::<Role>(), Ok(Role::ServiceProvider));
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn reads_the_persisted_layout() {
        let raw = r#"[{
            "id": "1700000000000",
            "name": "Ahmed Hassan",
            "email": "student@test.com",
            "password": "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA",
            "role": "student",
            "provider": "credentials",
            "image": "https://cdn.example.com/a.png",
            "createdAt": "2025-01-01T00:00:00.000Z"
        }]"#;
        let users: Vec<UserRecord> = serde_json::from_str(raw).expect("parse");
        let u = &users[0];
        assert_eq!(u.id, "1700000000000");
        assert_eq!(u.role, Role::Student);
        assert_eq!(u.provider, Provider::Credentials);
        assert!(u.has_password());
        assert_eq!(u.profile_image_url.as_deref(), Some("https://cdn.example.com/a.png"));
        assert!(u.updated_at.is_none());
    }

    #[test]
    fn unknown_role_in_data_file_is_rejected() {
        let raw = r#"{"id":"1","name":"x","email":"x@y.z","role":"admin","createdAt":"2025-01-01T00:00:00Z"}"#;
        assert!(serde_json::from_str::<UserRecord>(raw).is_err());
    }

    #[test]
    fn oauth_record_serializes_without_password_key() {
        let rec = UserRecord {
            id: "1".into(),
            name: "G".into(),
            email: "g@example.com".into(),
            password_hash: None,
            role: Role::Student,
            provider: Provider::Google,
            profile_image_url: None,
            phone: None,
            bio: None,
            university: None,
            location: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: None,
        };
        let json = serde_json::to_value(&rec).expect("serialize");
        assert!(json.get("password").is_none());
        assert_eq!(json["provider"], "google");
        assert_eq!(json["createdAt"], "1970-01-01T00:00:00Z");
    }

    #[test]
    fn patch_keeps_fields_it_does_not_name() {
        let mut rec: UserRecord = serde_json::from_str(
            r#"{"id":"1","name":"Old","email":"a@b.co","role":"agent","phone":"123","createdAt":"2025-01-01T00:00:00Z"}"#,
        )
        .expect("parse");
        UserPatch {
            name: Some("New".into()),
            ..Default::default()
        }
        .apply(&mut rec);
        assert_eq!(rec.name, "New");
        assert_eq!(rec.phone.as_deref(), Some("123"));
        assert_eq!(rec.role, Role::Agent);
    }
}
