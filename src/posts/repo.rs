use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use super::repo_types::{NewPost, PostFilter, PostPatch, PostRecord};
use crate::auth::repo_types::normalize_email;
use crate::store::{now_utc_millis, JsonFile, StoreError, StoreResult};

pub const POSTS_FILE: &str = "posts.json";

/// Listings over a single JSON array file. Same single-writer caveat as users.
#[derive(Debug, Clone)]
pub struct PostStore {
    file: JsonFile<PostRecord>,
}

fn not_found() -> StoreError {
    StoreError::NotFound("Post".into())
}

impl PostStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path),
        }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(POSTS_FILE))
    }

    /// Newest first, then paginated.
    pub async fn list(
        &self,
        filter: &PostFilter,
        limit: usize,
        offset: usize,
    ) -> StoreResult<Vec<PostRecord>> {
        let mut posts: Vec<PostRecord> = self
            .file
            .load()
            .await?
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts.into_iter().skip(offset).take(limit).collect())
    }

    pub async fn get(&self, id: &str) -> StoreResult<PostRecord> {
        self.file
            .load()
            .await?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(not_found)
    }

    pub async fn create(&self, new: NewPost) -> StoreResult<PostRecord> {
        let mut posts = self.file.load().await?;
        let now = now_utc_millis();
        let post = PostRecord {
            id: Uuid::new_v4().to_string(),
            user_email: normalize_email(&new.user_email),
            user_name: new.user_name,
            kind: new.kind,
            title: new.title,
            description: new.description,
            price: new.price,
            location: new.location,
            university: new.university,
            images: new.images,
            likes: Vec::new(),
            views: 0,
            created_at: now,
            updated_at: now,
        };
        posts.push(post.clone());
        self.file.persist(&posts).await?;
        info!(post_id = %post.id, owner = %post.user_email, "post created");
        Ok(post)
    }

    pub async fn update(&self, id: &str, patch: PostPatch) -> StoreResult<PostRecord> {
        let mut posts = self.file.load().await?;
        let post = posts.iter_mut().find(|p| p.id == id).ok_or_else(not_found)?;
        patch.apply(post);
        post.updated_at = now_utc_millis();
        let updated = post.clone();
        self.file.persist(&posts).await?;
        debug!(post_id = %id, "post updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        let mut posts = self.file.load().await?;
        let before = posts.len();
        posts.retain(|p| p.id != id);
        if posts.len() == before {
            return Err(not_found());
        }
        self.file.persist(&posts).await?;
        info!(post_id = %id, "post deleted");
        Ok(())
    }

    /// Add or remove `email` from the likes. Returns whether it is now liked.
    pub async fn toggle_like(&self, id: &str, email: &str) -> StoreResult<(bool, PostRecord)> {
        let email = normalize_email(email);
        let mut posts = self.file.load().await?;
        let post = posts.iter_mut().find(|p| p.id == id).ok_or_else(not_found)?;

        let liked = match post.likes.iter().position(|e| normalize_email(e) == email) {
            Some(idx) => {
                post.likes.remove(idx);
                false
            }
            None => {
                post.likes.push(email);
                true
            }
        };
        let snapshot = post.clone();
        self.file.persist(&posts).await?;
        debug!(post_id = %id, liked, "like toggled");
        Ok((liked, snapshot))
    }

    /// Bump the view counter and return the post.
    pub async fn record_view(&self, id: &str) -> StoreResult<PostRecord> {
        let mut posts = self.file.load().await?;
        let post = posts.iter_mut().find(|p| p.id == id).ok_or_else(not_found)?;
        post.views += 1;
        let snapshot = post.clone();
        self.file.persist(&posts).await?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posts::repo_types::PostKind;

    fn store() -> (tempfile::TempDir, PostStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PostStore::in_dir(dir.path());
        (dir, store)
    }

    fn new_post(title: &str, price: u64) -> NewPost {
        NewPost {
            user_email: "Owner@Test.com".into(),
            user_name: "Owner".into(),
            kind: PostKind::Property,
            title: title.into(),
            description: String::new(),
            price: Some(price),
            location: Some("Giza".into()),
            university: None,
            images: vec![],
        }
    }

    #[tokio::test]
    async fn create_normalizes_owner_and_starts_empty() {
        let (_dir, store) = store();
        let post = store.create(new_post("Room", 2000)).await.expect("create");
        assert_eq!(post.user_email, "owner@test.com");
        assert!(post.likes.is_empty());
        assert_eq!(post.views, 0);
        assert_eq!(store.get(&post.id).await.expect("get"), post);
    }

    #[tokio::test]
    async fn list_is_newest_first_and_paginated() {
        let (_dir, store) = store();
        for (i, title) in ["first", "second", "third"].iter().enumerate() {
            store
                .create(new_post(title, 1000 * (i as u64 + 1)))
                .await
                .expect("create");
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        let all = store.list(&PostFilter::default(), 20, 0).await.expect("list");
        let titles: Vec<&str> = all.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["third", "second", "first"]);

        let page = store.list(&PostFilter::default(), 1, 1).await.expect("list");
        assert_eq!(page[0].title, "second");

        let cheap = PostFilter {
            max_price: Some(2000),
            ..Default::default()
        };
        assert_eq!(store.list(&cheap, 20, 0).await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn like_toggles_on_and_off() {
        let (_dir, store) = store();
        let post = store.create(new_post("Room", 2000)).await.expect("create");

        let (liked, p) = store.toggle_like(&post.id, "Fan@test.com").await.expect("like");
        assert!(liked);
        assert_eq!(p.likes, vec!["fan@test.com".to_string()]);

        let (liked, p) = store.toggle_like(&post.id, "fan@test.com").await.expect("unlike");
        assert!(!liked);
        assert!(p.likes.is_empty());
    }

    #[tokio::test]
    async fn views_accumulate() {
        let (_dir, store) = store();
        let post = store.create(new_post("Room", 2000)).await.expect("create");
        store.record_view(&post.id).await.expect("view");
        let p = store.record_view(&post.id).await.expect("view");
        assert_eq!(p.views, 2);
    }

    #[tokio::test]
    async fn update_and_delete() {
        let (_dir, store) = store();
        let post = store.create(new_post("Room", 2000)).await.expect("create");

        let updated = store
            .update(
                &post.id,
                PostPatch {
                    title: Some("Bigger room".into()),
                    ..Default::default()
                },
            )
            .await
            .expect("update");
        assert_eq!(updated.title, "Bigger room");
        assert_eq!(updated.price, Some(2000));

        store.delete(&post.id).await.expect("delete");
        assert!(matches!(store.get(&post.id).await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete(&post.id).await, Err(StoreError::NotFound(_))));
    }
}
