use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{CreatePostRequest, LikeResponse, Pagination, PostResponse, MAX_PAGE_SIZE},
    repo_types::{NewPost, PostFilter, PostPatch},
};
use crate::{
    auth::{extractors::AuthSession, services::authorize_owner},
    error::{AppError, AppResult},
    state::AppState,
};

pub fn post_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/:id",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/posts/:id/like", post(toggle_like))
}

#[instrument(skip(state))]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(filter): Query<PostFilter>,
    Query(p): Query<Pagination>,
) -> AppResult<Json<Vec<PostResponse>>> {
    let posts = state
        .posts
        .list(&filter, p.limit.min(MAX_PAGE_SIZE), p.offset)
        .await?;
    Ok(Json(posts.into_iter().map(PostResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PostResponse>> {
    let post = state.posts.record_view(&id).await?;
    Ok(Json(post.into()))
}

#[instrument(skip(state, claims, body), fields(user_id = %claims.id))]
pub async fn create_post(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Json(body): Json<CreatePostRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<PostResponse>)> {
    if body.title.trim().is_empty() {
        return Err(AppError::MissingFields("title".into()));
    }

    let post = state
        .posts
        .create(NewPost {
            user_email: claims.email.clone(),
            user_name: claims.name.clone(),
            kind: body.kind,
            title: body.title.trim().to_string(),
            description: body.description,
            price: body.price,
            location: body.location,
            university: body.university,
            images: body.images,
        })
        .await?;

    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(&format!("/api/v1/posts/{}", post.id))
        .map_err(|e| AppError::Internal(e.into()))?;
    headers.insert(header::LOCATION, location);

    Ok((StatusCode::CREATED, headers, Json(post.into())))
}

#[instrument(skip(state, claims, patch), fields(user_id = %claims.id))]
pub async fn update_post(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(id): Path<String>,
    Json(patch): Json<PostPatch>,
) -> AppResult<Json<PostResponse>> {
    if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::Validation("Title cannot be empty".into()));
    }
    let existing = state.posts.get(&id).await?;
    authorize_owner(&claims, &existing.user_email)?;

    let post = state.posts.update(&id, patch).await?;
    Ok(Json(post.into()))
}

#[instrument(skip(state, claims), fields(user_id = %claims.id))]
pub async fn delete_post(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let existing = state.posts.get(&id).await?;
    authorize_owner(&claims, &existing.user_email)?;

    state.posts.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, claims), fields(user_id = %claims.id))]
pub async fn toggle_like(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(id): Path<String>,
) -> AppResult<Json<LikeResponse>> {
    let (liked, post) = state.posts.toggle_like(&id, &claims.email).await?;
    Ok(Json(LikeResponse {
        liked,
        likes: post.likes.len(),
    }))
}
