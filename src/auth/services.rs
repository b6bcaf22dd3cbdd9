use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    auth::{guard::Guard, jwt::JwtKeys, password},
    config::AdminBootstrap,
    error::AppError,
    state::AppState,
    store::{now_utc, NewSession, NewUser, Role, Session, User},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Registration data before hashing.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub about_me: Option<String>,
    pub dob: Option<String>,
    pub contact_number: Option<String>,
    pub country: Option<String>,
}

/// Register a user. Username, then email, then password are checked in that
/// order and the first failure is reported.
pub async fn signup(state: &AppState, reg: Registration, role: Role) -> Result<User, AppError> {
    let username = reg.username.trim().to_string();
    let email = reg.email.trim().to_lowercase();

    if username.is_empty() {
        return Err(AppError::Validation("Username cannot be empty".into()));
    }
    if !is_valid_email(&email) {
        return Err(AppError::Validation("Invalid email".into()));
    }

    let mut tx = state.store.begin().await?;

    if tx.user_by_username(&username).await?.is_some() {
        warn!(%username, "username already taken");
        return Err(AppError::username_taken());
    }
    if tx.user_by_email(&email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::email_taken());
    }
    let Some(plain) = reg.password.filter(|p| !p.is_empty()) else {
        return Err(AppError::signup_conflict("SGR-003", "Password cannot be null"));
    };

    let salted = password::hash_password(&plain).map_err(AppError::internal)?;
    let user = tx
        .create_user(NewUser {
            uuid: Uuid::new_v4(),
            username,
            email,
            password_hash: salted.digest,
            salt: salted.salt,
            role,
            first_name: reg.first_name,
            last_name: reg.last_name,
            about_me: reg.about_me,
            dob: reg.dob,
            contact_number: reg.contact_number,
            country: reg.country,
            created_at: now_utc(),
        })
        .await?;
    tx.commit().await?;

    info!(user_uuid = %user.uuid, username = %user.username, role = ?user.role, "user registered");
    Ok(user)
}

/// Exchange credentials for a fresh session.
pub async fn signin(state: &AppState, username: &str, plain: &str) -> Result<(User, Session), AppError> {
    let login = username.trim();
    let mut tx = state.store.begin().await?;

    let user = match tx.user_by_username(login).await? {
        Some(u) => Some(u),
        None => tx.user_by_email(&login.to_lowercase()).await?,
    };
    let Some(mut user) = user else {
        warn!(%login, "sign-in for unknown user");
        return Err(AppError::authentication_failed("ATH-001", "This username does not exist"));
    };

    let ok = password::verify_password(plain, &user.salt, &user.password_hash)
        .map_err(AppError::internal)?;
    if !ok {
        warn!(user_uuid = %user.uuid, "sign-in with wrong password");
        return Err(AppError::authentication_failed("ATH-002", "Password failed"));
    }

    let keys = JwtKeys::from_ref(state);
    let now = now_utc();
    let expires_at = now + keys.session_ttl;
    let token = keys
        .sign(user.uuid, now, expires_at)
        .map_err(AppError::internal)?;

    // tokens that can no longer authenticate, kept one extra ttl so they
    // still report SESSION_ENDED for a while
    let purged = tx
        .purge_sessions(
            user.id,
            now - keys.session_ttl,
            !Guard::from_ref(state).enforce_expiry,
        )
        .await?;
    if purged > 0 {
        debug!(user_uuid = %user.uuid, purged, "stale sessions removed");
    }

    let session = tx
        .create_session(NewSession {
            token,
            user_id: user.id,
            login_at: now,
            expires_at,
        })
        .await?;

    user.last_login_at = Some(now);
    tx.update_user(&user).await?;
    tx.commit().await?;

    info!(user_uuid = %user.uuid, session_id = session.id, "user signed in");
    Ok((user, session))
}

/// End the session behind `token`; returns the owner's uuid.
pub async fn signout(state: &AppState, token: &str) -> Result<Uuid, AppError> {
    let guard = Guard::from_ref(state);
    let mut tx = state.store.begin().await?;
    let owner = guard.terminate(tx.as_mut(), token, now_utc()).await?;
    tx.commit().await?;

    info!(user_uuid = %owner, "user signed out");
    Ok(owner)
}

/// Create the configured administrator unless the username already exists.
pub async fn ensure_admin(state: &AppState, admin: &AdminBootstrap) -> Result<Option<User>, AppError> {
    {
        let mut tx = state.store.begin().await?;
        if let Some(existing) = tx.user_by_username(admin.username.trim()).await? {
            if existing.role != Role::Admin {
                warn!(username = %existing.username, "bootstrap admin name belongs to a non-admin user");
            }
            return Ok(None);
        }
    }

    let reg = Registration {
        username: admin.username.clone(),
        email: admin.email.clone(),
        password: Some(admin.password.clone()),
        ..Registration::default()
    };
    signup(state, reg, Role::Admin).await.map(Some)
}
