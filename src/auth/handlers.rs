use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        claims::{SessionClaims, SessionUpdate},
        dto::{
            AuthResponse, LoginRequest, OAuthRequest, PasswordChangeRequest, PublicUser,
            RegisterRequest, SessionResponse,
        },
        extractors::AuthSession,
        repo_types::Provider,
        services::SessionService,
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/oauth/:provider", post(oauth_login))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/session", get(get_session).post(update_session))
        .route("/auth/profile", get(get_profile).put(update_profile))
        .route("/auth/password", put(change_password))
}

#[instrument(skip(sessions, payload))]
pub async fn register(
    State(sessions): State<SessionService>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let (user, claims) = sessions.register(payload).await?;
    let token = sessions.issue(&claims)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(sessions, payload))]
pub async fn login(
    State(sessions): State<SessionService>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let (user, claims) = sessions.login(&payload.email, &payload.password).await?;
    let token = sessions.issue(&claims)?;
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, sessions, payload))]
pub async fn oauth_login(
    State(state): State<AppState>,
    State(sessions): State<SessionService>,
    Path(provider): Path<String>,
    Json(payload): Json<OAuthRequest>,
) -> AppResult<Json<AuthResponse>> {
    let provider = match provider.parse::<Provider>() {
        Ok(p) if p.is_oauth() => p,
        _ => {
            warn!(%provider, "unsupported oauth provider");
            return Err(AppError::NotFound(format!("Provider {}", provider)));
        }
    };
    if payload.access_token.trim().is_empty() {
        return Err(AppError::MissingFields("access_token".into()));
    }

    let identity = state
        .oauth
        .fetch_identity(provider, payload.access_token.trim())
        .await?;
    let (user, claims) = sessions.login_oauth(identity).await?;
    let token = sessions.issue(&claims)?;

    info!(user_id = %user.id, %provider, "oauth login");
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(claims), fields(user_id = %claims.id))]
pub async fn get_session(AuthSession(claims): AuthSession) -> Json<SessionClaims> {
    Json(claims)
}

/// Client-triggered refresh: merges display fields into the current claims.
#[instrument(skip(sessions, claims, update), fields(user_id = %claims.id))]
pub async fn update_session(
    State(sessions): State<SessionService>,
    AuthSession(claims): AuthSession,
    Json(update): Json<SessionUpdate>,
) -> AppResult<Json<SessionResponse>> {
    let claims = sessions.refresh(claims, update)?;
    let token = sessions.issue(&claims)?;
    Ok(Json(SessionResponse { token, claims }))
}

#[instrument(skip(sessions, claims), fields(user_id = %claims.id))]
pub async fn get_profile(
    State(sessions): State<SessionService>,
    AuthSession(claims): AuthSession,
) -> AppResult<Json<PublicUser>> {
    Ok(Json(sessions.profile(&claims).await?))
}

#[instrument(skip(sessions, claims, update), fields(user_id = %claims.id))]
pub async fn update_profile(
    State(sessions): State<SessionService>,
    AuthSession(claims): AuthSession,
    Json(update): Json<SessionUpdate>,
) -> AppResult<Json<AuthResponse>> {
    let (user, fresh) = sessions.update_profile(&claims, update).await?;
    let token = sessions.issue(&fresh)?;
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(sessions, claims, payload), fields(user_id = %claims.id))]
pub async fn change_password(
    State(sessions): State<SessionService>,
    AuthSession(claims): AuthSession,
    Json(payload): Json<PasswordChangeRequest>,
) -> AppResult<StatusCode> {
    sessions.change_password(&claims, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}
