use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::{PostKind, PostRecord};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub kind: PostKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Option<u64>,
    pub location: Option<String>,
    pub university: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    pub user_email: String,
    pub user_name: String,
    pub kind: PostKind,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub university: Option<String>,
    pub images: Vec<String>,
    pub likes: usize,
    pub views: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<PostRecord> for PostResponse {
    fn from(p: PostRecord) -> Self {
        Self {
            id: p.id,
            user_email: p.user_email,
            user_name: p.user_name,
            kind: p.kind,
            title: p.title,
            description: p.description,
            price: p.price,
            location: p.location,
            university: p.university,
            images: p.images,
            likes: p.likes.len(),
            views: p.views,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes: usize,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}
fn default_limit() -> usize {
    20
}

pub const MAX_PAGE_SIZE: usize = 100;
