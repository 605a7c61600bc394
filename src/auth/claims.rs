use serde::{Deserialize, Serialize};

use crate::auth::repo_types::{normalize_email, Role, UserRecord};

/// Identity payload carried by a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub id: String, // UserRecord id
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub university: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>, // remote backend bearer token
}

impl SessionClaims {
    pub fn from_record(user: &UserRecord, access_token: Option<String>) -> Self {
        Self {
            id: user.id.clone(),
            email: normalize_email(&user.email),
            name: user.name.clone(),
            role: user.role,
            picture: user.profile_image_url.clone(),
            phone: user.phone.clone(),
            bio: user.bio.clone(),
            university: user.university.clone(),
            location: user.location.clone(),
            access_token,
        }
    }

    /// Merge display fields. Identity fields (`id`, `email`, `role`) are not reachable.
    pub fn apply_update(&mut self, update: SessionUpdate) {
        if let Some(v) = update.name {
            self.name = v;
        }
        if let Some(v) = update.image {
            self.picture = Some(v);
        }
        if let Some(v) = update.phone {
            self.phone = Some(v);
        }
        if let Some(v) = update.bio {
            self.bio = Some(v);
        }
        if let Some(v) = update.university {
            self.university = Some(v);
        }
        if let Some(v) = update.location {
            self.location = Some(v);
        }
    }

    pub fn owns(&self, owner_email: &str) -> bool {
        normalize_email(&self.email) == normalize_email(owner_email)
    }
}

/// Client-submitted session refresh. Any key outside this list is rejected.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionUpdate {
    pub name: Option<String>,
    pub image: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub university: Option<String>,
    pub location: Option<String>,
}

/// Signed JWT payload: session claims plus registered claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub session: SessionClaims,
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> SessionClaims {
        SessionClaims {
            id: "1700000000000".into(),
            email: "ahmed@test.com".into(),
            name: "Ahmed".into(),
            role: Role::Student,
            picture: None,
            phone: Some("0100".into()),
            bio: None,
            university: Some("Cairo University".into()),
            location: None,
            access_token: Some("backend-token".into()),
        }
    }

    #[test]
    fn update_overwrites_only_present_fields() {
        let mut c = claims();
        c.apply_update(SessionUpdate {
            name: Some("New Name".into()),
            ..Default::default()
        });
        assert_eq!(c.name, "New Name");
        assert_eq!(c.email, "ahmed@test.com");
        assert_eq!(c.role, Role::Student);
        assert_eq!(c.phone.as_deref(), Some("0100"));
        assert_eq!(c.access_token.as_deref(), Some("backend-token"));
    }

    #[test]
    fn update_is_idempotent() {
        let update = SessionUpdate {
            image: Some("https://cdn/x.png".into()),
            location: Some("Giza".into()),
            ..Default::default()
        };
        let mut once = claims();
        once.apply_update(update.clone());
        let mut twice = once.clone();
        twice.apply_update(update);
        assert_eq!(once, twice);
    }

    #[test]
    fn update_payload_cannot_carry_identity_fields() {
        let role = serde_json::from_str::<SessionUpdate>(r#"{"name":"x","role":"owner"}"#);
        assert!(role.is_err());
        let email = serde_json::from_str::<SessionUpdate>(r#"{"email":"evil@test.com"}"#);
        assert!(email.is_err());
        let ok = serde_json::from_str::<SessionUpdate>(r#"{"bio":"hi"}"#).expect("allowed");
        assert_eq!(ok.bio.as_deref(), Some("hi"));
    }

    #[test]
    fn token_payload_uses_wire_names() {
        let token = Claims {
            session: claims(),
            iat: 1,
            exp: 2,
            iss: "roomhub".into(),
            aud: "roomhub-users".into(),
        };
        let v = serde_json::to_value(&token).expect("serialize");
        assert_eq!(v["id"], "1700000000000");
        assert_eq!(v["accessToken"], "backend-token");
        assert_eq!(v["role"], "student");
        assert!(v.get("picture").is_none());

        let back: Claims = serde_json::from_value(v).expect("deserialize");
        assert_eq!(back.session, claims());
    }

    #[test]
    fn ownership_compares_normalized_emails() {
        let c = claims();
        assert!(c.owns(" Ahmed@Test.com"));
        assert!(!c.owns("someone@test.com"));
    }
}
