//! Test accounts and one-off user creation for the admin binary.

use anyhow::{bail, Context};
use tracing::{info, warn};

use crate::auth::{
    password::{hash_password_blocking, MIN_PASSWORD_LEN},
    repo::IdentityStore,
    repo_types::{normalize_email, NewUser, Provider, Role},
};

/// One credentials account per role: (name, email, password, role).
pub const SEED_USERS: [(&str, &str, &str, Role); 4] = [
    ("Test Student", "student@test.com", "student123", Role::Student),
    ("Test Agent", "agent@test.com", "agent123", Role::Agent),
    ("Test Owner", "owner@test.com", "owner123", Role::Owner),
    ("Test Provider", "provider@test.com", "provider123", Role::ServiceProvider),
];

/// Insert a credentials account. Returns `false` when the email is already taken.
pub async fn create_user(
    store: &dyn IdentityStore,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<bool> {
    let email = normalize_email(email);
    if store.find_by_email(&email).await?.is_some() {
        warn!(%email, "already exists, skipping");
        return Ok(false);
    }
    if name.trim().is_empty() {
        bail!("name for {} is required", email);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        bail!("password for {} must be at least {} characters", email, MIN_PASSWORD_LEN);
    }

    let hash = hash_password_blocking(password.to_string()).await?;
    let record = store
        .append(NewUser {
            name: name.trim().to_string(),
            email,
            password_hash: Some(hash),
            role,
            provider: Provider::Credentials,
            profile_image_url: None,
        })
        .await
        .context("append user")?;
    info!(id = %record.id, email = %record.email, role = %record.role, "user created");
    Ok(true)
}

/// Create every missing seed account. Returns how many were inserted.
pub async fn seed(store: &dyn IdentityStore) -> anyhow::Result<usize> {
    let mut created = 0;
    for (name, email, password, role) in SEED_USERS {
        if create_user(store, name, email, password, role).await? {
            created += 1;
        }
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{password::verify_password, repo::JsonIdentityStore};

    fn store() -> (tempfile::TempDir, JsonIdentityStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonIdentityStore::in_dir(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn seed_creates_one_user_per_role_once() {
        let (_dir, store) = store();
        assert_eq!(seed(&store).await.expect("seed"), 4);
        assert_eq!(seed(&store).await.expect("reseed"), 0);

        let users = store.list_all().await.expect("list");
        assert_eq!(users.len(), 4);
        for role in Role::ALL {
            assert_eq!(users.iter().filter(|u| u.role == role).count(), 1);
        }
        let owner = users
            .iter()
            .find(|u| u.email == "owner@test.com")
            .expect("owner");
        assert_eq!(owner.provider, Provider::Credentials);
        let hash = owner.password_hash.as_deref().expect("hash");
        assert!(verify_password("owner123", hash).expect("verify"));
    }

    #[tokio::test]
    async fn seed_skips_emails_that_already_exist() {
        let (_dir, store) = store();
        assert!(create_user(&store, "Mine", "Agent@Test.com", "my-own-pass", Role::Owner)
            .await
            .expect("create"));

        assert_eq!(seed(&store).await.expect("seed"), 3);
        let agent = store
            .find_by_email("agent@test.com")
            .await
            .expect("find")
            .expect("agent");
        assert_eq!(agent.name, "Mine");
        assert_eq!(agent.role, Role::Owner);
    }

    #[tokio::test]
    async fn create_user_rejects_duplicates_and_short_passwords() {
        let (_dir, store) = store();
        assert!(create_user(&store, "Ahmed", "ahmed@test.com", "student123", Role::Student)
            .await
            .expect("create"));
        assert!(!create_user(&store, "Again", "AHMED@test.com", "student123", Role::Agent)
            .await
            .expect("duplicate"));
        assert!(create_user(&store, "Short", "short@test.com", "abc", Role::Student)
            .await
            .is_err());
        assert_eq!(store.list_all().await.expect("list").len(), 1);
    }
}
