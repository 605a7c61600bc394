use std::sync::Arc;

use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        claims::{SessionClaims, SessionUpdate},
        dto::{PasswordChangeRequest, PublicUser, RegisterRequest},
        jwt::JwtKeys,
        oauth::OAuthIdentity,
        password::{
            burn_verification, hash_password_blocking, needs_rehash, verify_password_blocking,
            MIN_PASSWORD_LEN,
        },
        repo::IdentityStore,
        repo_types::{normalize_email, NewUser, Provider, Role, UserPatch, UserRecord},
    },
    backend::BackendClient,
    error::{AppError, AppResult},
    state::AppState,
    store::StoreError,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Mutation of a resource owned by `owner_email` requires the same session email.
pub fn authorize_owner(claims: &SessionClaims, owner_email: &str) -> AppResult<()> {
    if claims.owns(owner_email) {
        Ok(())
    } else {
        warn!(user_id = %claims.id, "ownership check failed");
        Err(AppError::Forbidden)
    }
}

fn missing(fields: &[(&str, &str)]) -> AppResult<()> {
    let names: Vec<&str> = fields
        .iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| *k)
        .collect();
    if names.is_empty() {
        Ok(())
    } else {
        Err(AppError::MissingFields(names.join(", ")))
    }
}

/// Compare against a stored hash. An unusable hash is a failed check, never a server fault.
async fn check_password(plain: &str, hash: &str, user_id: &str) -> bool {
    match verify_password_blocking(plain.to_string(), hash.to_string()).await {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, user_id = %user_id, "stored password hash unusable");
            false
        }
    }
}

fn validate_update(update: &SessionUpdate) -> AppResult<()> {
    if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::Validation("Name cannot be empty".into()));
    }
    Ok(())
}

impl From<SessionUpdate> for UserPatch {
    fn from(u: SessionUpdate) -> Self {
        UserPatch {
            name: u.name.map(|n| n.trim().to_string()),
            password_hash: None,
            profile_image_url: u.image,
            phone: u.phone,
            bio: u.bio,
            university: u.university,
            location: u.location,
        }
    }
}

/// Builds and refreshes session claims from credentials, OAuth identities and
/// client update triggers.
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn IdentityStore>,
    keys: JwtKeys,
    backend: Option<Arc<dyn BackendClient>>,
}

impl FromRef<AppState> for SessionService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.users.clone(),
            JwtKeys::from_ref(state),
            state.backend.clone(),
        )
    }
}

impl SessionService {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        keys: JwtKeys,
        backend: Option<Arc<dyn BackendClient>>,
    ) -> Self {
        Self {
            store,
            keys,
            backend,
        }
    }

    /// Sign a token carrying `claims`.
    pub fn issue(&self, claims: &SessionClaims) -> AppResult<String> {
        self.keys.sign(claims).map_err(|e| {
            error!(error = %e, "jwt sign failed");
            AppError::Internal(e)
        })
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn register(&self, req: RegisterRequest) -> AppResult<(UserRecord, SessionClaims)> {
        missing(&[
            ("name", req.name.as_str()),
            ("email", req.email.as_str()),
            ("password", req.password.as_str()),
        ])?;

        let email = normalize_email(&req.email);
        if !is_valid_email(&email) {
            warn!("invalid email");
            return Err(AppError::Validation("Invalid email".into()));
        }
        if req.password.chars().count() < MIN_PASSWORD_LEN {
            warn!("password too short");
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        let role = match req.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) => r.parse::<Role>().map_err(AppError::Validation)?,
            None => Role::Student,
        };

        // Ensure email is not taken before paying for the hash
        if self.store.find_by_email(&email).await?.is_some() {
            warn!("email already registered");
            return Err(AppError::Conflict("Email already registered".into()));
        }

        let hash = hash_password_blocking(req.password).await?;
        let user = self
            .store
            .append(NewUser {
                name: req.name,
                email,
                password_hash: Some(hash),
                role,
                provider: Provider::Credentials,
                profile_image_url: None,
            })
            .await?;

        info!(user_id = %user.id, role = %user.role, "user registered");
        let claims = SessionClaims::from_record(&user, None);
        Ok((user, claims))
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(UserRecord, SessionClaims)> {
        missing(&[("email", email), ("password", password)])?;
        let email = normalize_email(email);

        let user = match self.store.find_by_email(&email).await? {
            Some(u) if u.has_password() => u,
            Some(u) => {
                warn!(user_id = %u.id, provider = %u.provider, "login on account without password");
                burn_verification(password.to_string()).await;
                return Err(AppError::InvalidCredentials);
            }
            None => {
                warn!("login unknown email");
                burn_verification(password.to_string()).await;
                return Err(AppError::InvalidCredentials);
            }
        };

        let hash = user.password_hash.clone().unwrap_or_default();
        if !check_password(password, &hash, &user.id).await {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }
        let user = if needs_rehash(&hash) {
            self.upgrade_hash(user, password).await
        } else {
            user
        };

        let access_token = self.backend_token(&email, password).await;
        info!(user_id = %user.id, "user logged in");
        let claims = SessionClaims::from_record(&user, access_token);
        Ok((user, claims))
    }

    /// Replace a legacy hash after a successful login. Failure keeps the old one.
    async fn upgrade_hash(&self, user: UserRecord, password: &str) -> UserRecord {
        let hash = match hash_password_blocking(password.to_string()).await {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, user_id = %user.id, "password rehash failed");
                return user;
            }
        };
        let patch = UserPatch {
            password_hash: Some(hash),
            ..Default::default()
        };
        match self.store.update_by_email(&user.email, patch).await {
            Ok(updated) => {
                info!(user_id = %updated.id, "legacy password hash upgraded");
                updated
            }
            Err(e) => {
                warn!(error = %e, user_id = %user.id, "storing upgraded hash failed");
                user
            }
        }
    }

    async fn backend_token(&self, email: &str, password: &str) -> Option<String> {
        let backend = self.backend.as_ref()?;
        match backend.login(email, password).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "backend login failed; session issued without access token");
                None
            }
        }
    }

    /// First login provisions a `student` record; later logins reuse it.
    #[instrument(skip(self, identity), fields(provider = %identity.provider, email = %identity.email))]
    pub async fn login_oauth(&self, identity: OAuthIdentity) -> AppResult<(UserRecord, SessionClaims)> {
        let email = normalize_email(&identity.email);
        if email.is_empty() {
            return Err(AppError::Provider("provider returned an empty email".into()));
        }

        let user = match self.store.find_by_email(&email).await? {
            Some(existing) => existing,
            None => {
                let name = identity
                    .name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
                let new_user = NewUser {
                    name,
                    email: email.clone(),
                    password_hash: None,
                    role: Role::Student,
                    provider: identity.provider,
                    profile_image_url: identity.image,
                };
                match self.store.append(new_user).await {
                    Ok(u) => {
                        info!(user_id = %u.id, "oauth user provisioned");
                        u
                    }
                    // provisioned by a parallel request in the meantime
                    Err(StoreError::Conflict(_)) => self
                        .store
                        .find_by_email(&email)
                        .await?
                        .ok_or_else(|| AppError::NotFound("User".into()))?,
                    Err(e) => return Err(e.into()),
                }
            }
        };

        let claims = SessionClaims::from_record(&user, None);
        Ok((user, claims))
    }

    /// Merge client-submitted display fields into the current claims. Role,
    /// email and id carry over untouched; nothing is re-verified.
    pub fn refresh(&self, mut claims: SessionClaims, update: SessionUpdate) -> AppResult<SessionClaims> {
        validate_update(&update)?;
        claims.apply_update(update);
        Ok(claims)
    }

    /// Stored profile for the session. A store miss yields a minimal profile
    /// built from the claims so clients keep working. That profile is not
    /// written back: the claims carry no provider or password, and a
    /// credentials record without a hash is not a valid record.
    pub async fn profile(&self, claims: &SessionClaims) -> AppResult<PublicUser> {
        match self.store.find_by_email(&claims.email).await? {
            Some(user) => Ok(PublicUser::from(&user)),
            None => {
                warn!(user_id = %claims.id, "no stored record for session; serving claims profile");
                Ok(PublicUser::from(claims))
            }
        }
    }

    /// Persist profile fields and re-derive the claims from the stored record.
    /// A session whose record is gone gets `NotFound`; there is nothing to patch.
    #[instrument(skip(self, claims, update), fields(user_id = %claims.id))]
    pub async fn update_profile(
        &self,
        claims: &SessionClaims,
        update: SessionUpdate,
    ) -> AppResult<(UserRecord, SessionClaims)> {
        validate_update(&update)?;
        let patch = UserPatch::from(update);
        if patch.is_empty() {
            return Err(AppError::MissingFields("at least one profile field".into()));
        }
        let user = self.store.update_by_email(&claims.email, patch).await?;
        info!("profile updated");
        let fresh = SessionClaims::from_record(&user, claims.access_token.clone());
        Ok((user, fresh))
    }

    /// Change the password, or set one on an OAuth-only account.
    #[instrument(skip(self, claims, req), fields(user_id = %claims.id))]
    pub async fn change_password(
        &self,
        claims: &SessionClaims,
        req: PasswordChangeRequest,
    ) -> AppResult<()> {
        missing(&[("newPassword", req.new_password.as_str())])?;
        if req.new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let user = self
            .store
            .find_by_email(&claims.email)
            .await?
            .ok_or_else(|| AppError::NotFound("User".into()))?;

        if let Some(current_hash) = user.password_hash.clone().filter(|h| !h.is_empty()) {
            let current = req.current_password.unwrap_or_default();
            missing(&[("currentPassword", current.as_str())])?;
            if !check_password(&current, &current_hash, &user.id).await {
                return Err(AppError::InvalidCredentials);
            }
        }

        let hash = hash_password_blocking(req.new_password).await?;
        self.store
            .update_by_email(
                &claims.email,
                UserPatch {
                    password_hash: Some(hash),
                    ..Default::default()
                },
            )
            .await?;
        info!("password changed");
        Ok(())
    }
}
