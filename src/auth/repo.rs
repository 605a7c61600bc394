use std::path::{Path, PathBuf};

use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::auth::repo_types::{normalize_email, NewUser, UserPatch, UserRecord};
use crate::store::{now_utc_millis, JsonFile, StoreError, StoreResult};

pub const USERS_FILE: &str = "users.json";

/// Lookup and mutation of identity records keyed by email.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Case-insensitive lookup. A miss is `Ok(None)`.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;

    async fn list_all(&self) -> StoreResult<Vec<UserRecord>>;

    /// Assign id and timestamps, then persist. Duplicate emails are a conflict.
    async fn append(&self, user: NewUser) -> StoreResult<UserRecord>;

    /// Merge present fields into the matching record and bump `updated_at`.
    async fn update_by_email(&self, email: &str, patch: UserPatch) -> StoreResult<UserRecord>;
}

/// Identity store over a single JSON array file. Single-writer only.
#[derive(Debug, Clone)]
pub struct JsonIdentityStore {
    file: JsonFile<UserRecord>,
}

impl JsonIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path),
        }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(USERS_FILE))
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Millisecond timestamp id, bumped past the largest existing numeric id.
/// An id already at `u64::MAX` cannot be bumped, so the timestamp is used as is.
fn next_id(existing: &[UserRecord], now: OffsetDateTime) -> String {
    let now_ms = u64::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or(0);
    let last = existing
        .iter()
        .filter_map(|u| u.id.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    last.checked_add(1)
        .map_or(now_ms, |next| now_ms.max(next))
        .to_string()
}

#[async_trait]
impl IdentityStore for JsonIdentityStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let wanted = normalize_email(email);
        let users = self.file.load().await?;
        Ok(users.into_iter().find(|u| u.matches_email(&wanted)))
    }

    async fn list_all(&self) -> StoreResult<Vec<UserRecord>> {
        self.file.load().await
    }

    async fn append(&self, user: NewUser) -> StoreResult<UserRecord> {
        let email = normalize_email(&user.email);
        if email.is_empty() {
            return Err(StoreError::Invalid("email is required".into()));
        }
        let password_hash = user.password_hash.filter(|h| !h.is_empty());
        if !user.provider.is_oauth() && password_hash.is_none() {
            return Err(StoreError::Invalid(
                "credentials account requires a password".into(),
            ));
        }

        let mut users = self.file.load().await?;
        if users.iter().any(|u| u.matches_email(&email)) {
            return Err(StoreError::Conflict("Email already registered".into()));
        }

        let now = now_utc_millis();
        let record = UserRecord {
            id: next_id(&users, now),
            name: user.name.trim().to_string(),
            email,
            password_hash,
            role: user.role,
            provider: user.provider,
            profile_image_url: user.profile_image_url,
            phone: None,
            bio: None,
            university: None,
            location: None,
            created_at: now,
            updated_at: Some(now),
        };
        users.push(record.clone());
        self.file.persist(&users).await?;

        info!(user_id = %record.id, email = %record.email, provider = %record.provider, "user record appended");
        Ok(record)
    }

    async fn update_by_email(&self, email: &str, patch: UserPatch) -> StoreResult<UserRecord> {
        let wanted = normalize_email(email);
        let mut users = self.file.load().await?;
        let record = users
            .iter_mut()
            .find(|u| u.matches_email(&wanted))
            .ok_or_else(|| StoreError::NotFound("User".into()))?;

        patch.apply(record);
        record.updated_at = Some(now_utc_millis());
        let updated = record.clone();
        self.file.persist(&users).await?;

        debug!(user_id = %updated.id, "user record updated");
        Ok(updated)
    }
}
