//! Authorization guard.
//!
//! Every guarded operation resolves its bearer token here first, inside the
//! same transaction that later performs the mutation. Ownership and admin
//! checks only accept an [`ActiveSession`] produced by [`Guard::validate`],
//! so the acting identity always comes from the session just validated.

use axum::extract::FromRef;
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    state::AppState,
    store::{now_utc, Role, Session, StoreTx, User},
};

/// A session that passed validation, together with its user.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub session: Session,
    pub user: User,
}

#[derive(Debug, Clone, Copy)]
pub struct Guard {
    pub enforce_expiry: bool,
}

impl FromRef<AppState> for Guard {
    fn from_ref(state: &AppState) -> Self {
        Self {
            enforce_expiry: state.config.session.enforce_expiry,
        }
    }
}

impl Guard {
    /// Resolve `token` to an active session.
    ///
    /// `action` completes the signed-out message ("Sign in first to ...").
    pub async fn validate(
        &self,
        tx: &mut dyn StoreTx,
        token: &str,
        now: OffsetDateTime,
        action: &str,
    ) -> Result<ActiveSession, AppError> {
        let Some(session) = tx.session_by_token(token).await? else {
            warn!("no session for presented token");
            return Err(AppError::auth_required("ATHR-001", "User has not signed in"));
        };

        if session.is_terminated() {
            warn!(session_id = session.id, "token belongs to a signed out session");
            return Err(AppError::session_ended(
                "ATHR-002",
                format!("User is signed out.Sign in first to {action}"),
            ));
        }

        if self.enforce_expiry && session.is_expired(now) {
            warn!(session_id = session.id, expires_at = %session.expires_at, "session expired");
            return Err(AppError::session_ended(
                "ATHR-002",
                format!("Session has expired.Sign in first to {action}"),
            ));
        }

        let user = tx.user_by_id(session.user_id).await?.ok_or_else(|| {
            // the user row cascades to its sessions, so this only happens mid-delete
            AppError::auth_required("ATHR-001", "User has not signed in")
        })?;

        debug!(session_id = session.id, user_uuid = %user.uuid, "session validated");
        Ok(ActiveSession { session, user })
    }

    /// End the session behind `token` and return its owner's uuid.
    ///
    /// An unknown token and an already ended session are both reported as
    /// `SESSION_ENDED`. The row is kept so the token keeps failing that way.
    pub async fn terminate(
        &self,
        tx: &mut dyn StoreTx,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Uuid, AppError> {
        let not_signed_in = || AppError::session_ended("SGR-001", "User is not Signed in");

        let Some(mut session) = tx.session_by_token(token).await? else {
            warn!("sign-out with unknown token");
            return Err(not_signed_in());
        };
        if session.is_terminated() {
            warn!(session_id = session.id, "sign-out of an ended session");
            return Err(not_signed_in());
        }

        let user = tx
            .user_by_id(session.user_id)
            .await?
            .ok_or_else(not_signed_in)?;

        session.logout_at = Some(logout_instant(session.login_at, now));
        tx.update_session(&session).await?;
        Ok(user.uuid)
    }
}

/// A logout instant strictly after `login_at`, even when the clock has not
/// advanced past it.
fn logout_instant(login_at: OffsetDateTime, now: OffsetDateTime) -> OffsetDateTime {
    if now > login_at {
        now
    } else {
        login_at + Duration::microseconds(1)
    }
}

/// Hand back `err` once `token` has been validated for `action`. A token that
/// fails validation reports its own auth error instead.
pub async fn after_validation(
    state: &AppState,
    token: &str,
    action: &str,
    err: AppError,
) -> AppError {
    let mut tx = match state.store.begin().await {
        Ok(tx) => tx,
        Err(e) => return e,
    };
    match Guard::from_ref(state)
        .validate(tx.as_mut(), token, now_utc(), action)
        .await
    {
        Ok(_) => err,
        Err(auth) => auth,
    }
}

pub fn check_ownership(
    active: &ActiveSession,
    owner_id: i64,
    message: &str,
) -> Result<(), AppError> {
    if active.user.id == owner_id {
        Ok(())
    } else {
        warn!(user_uuid = %active.user.uuid, owner_id, "ownership check failed");
        Err(AppError::ownership("ATHR-003", message))
    }
}

pub fn check_admin(active: &ActiveSession) -> Result<(), AppError> {
    match active.user.role {
        Role::Admin => Ok(()),
        Role::NonAdmin => {
            warn!(user_uuid = %active.user.uuid, "admin check failed");
            Err(AppError::ownership(
                "ATHR-003",
                "Unauthorized Access, Entered user is not an admin",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{now_utc, MemoryStore, NewSession, NewUser, Store};

    async fn seed(store: &MemoryStore, role: Role, expires_in: Duration) -> (User, String) {
        let mut tx = store.begin().await.unwrap();
        let now = now_utc();
        let user = tx
            .create_user(NewUser {
                uuid: Uuid::new_v4(),
                username: format!("u-{}", Uuid::new_v4()),
                email: format!("{}@example.com", Uuid::new_v4()),
                password_hash: "d".into(),
                salt: "s".into(),
                role,
                first_name: None,
                last_name: None,
                about_me: None,
                dob: None,
                contact_number: None,
                country: None,
                created_at: now,
            })
            .await
            .unwrap();
        let token = format!("tok-{}", Uuid::new_v4());
        tx.create_session(NewSession {
            token: token.clone(),
            user_id: user.id,
            login_at: now,
            expires_at: now + expires_in,
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();
        (user, token)
    }

    const GUARD: Guard = Guard { enforce_expiry: true };

    #[tokio::test]
    async fn unknown_token_requires_auth() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let err = GUARD
            .validate(tx.as_mut(), "nope", now_utc(), "post a question")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AuthRequired { code: "ATHR-001", .. }));
    }

    #[tokio::test]
    async fn valid_token_resolves_session_and_user() {
        let store = MemoryStore::new();
        let (user, token) = seed(&store, Role::NonAdmin, Duration::hours(8)).await;
        let mut tx = store.begin().await.unwrap();
        let active = GUARD
            .validate(tx.as_mut(), &token, now_utc(), "post a question")
            .await
            .unwrap();
        assert_eq!(active.user.id, user.id);
        assert_eq!(active.session.token, token);
    }

    #[tokio::test]
    async fn terminated_session_is_ended_for_every_later_use() {
        let store = MemoryStore::new();
        let (user, token) = seed(&store, Role::NonAdmin, Duration::hours(8)).await;

        let mut tx = store.begin().await.unwrap();
        let owner = GUARD.terminate(tx.as_mut(), &token, now_utc()).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(owner, user.uuid);

        let mut tx = store.begin().await.unwrap();
        let err = GUARD
            .validate(tx.as_mut(), &token, now_utc(), "edit the question")
            .await
            .unwrap_err();
        match err {
            AppError::SessionEnded { code, message } => {
                assert_eq!(code, "ATHR-002");
                assert_eq!(message, "User is signed out.Sign in first to edit the question");
            }
            other => panic!("unexpected {other:?}"),
        }

        let err = GUARD.terminate(tx.as_mut(), &token, now_utc()).await.unwrap_err();
        assert!(matches!(err, AppError::SessionEnded { code: "SGR-001", .. }));
    }

    #[tokio::test]
    async fn terminate_unknown_token_reports_session_ended() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let err = GUARD.terminate(tx.as_mut(), "never-issued", now_utc()).await.unwrap_err();
        assert!(matches!(err, AppError::SessionEnded { .. }));
    }

    #[tokio::test]
    async fn terminate_at_login_instant_still_ends_the_session() {
        let store = MemoryStore::new();
        let (_, token) = seed(&store, Role::NonAdmin, Duration::hours(8)).await;
        let mut tx = store.begin().await.unwrap();
        let login_at = tx.session_by_token(&token).await.unwrap().unwrap().login_at;
        GUARD.terminate(tx.as_mut(), &token, login_at).await.unwrap();
        let session = tx.session_by_token(&token).await.unwrap().unwrap();
        assert!(session.is_terminated());
    }

    #[tokio::test]
    async fn expired_session_is_rejected_when_expiry_is_enforced() {
        let store = MemoryStore::new();
        let (_, token) = seed(&store, Role::NonAdmin, Duration::hours(8)).await;
        let later = now_utc() + Duration::hours(9);
        let mut tx = store.begin().await.unwrap();
        let err = GUARD
            .validate(tx.as_mut(), &token, later, "post a question")
            .await
            .unwrap_err();
        match err {
            AppError::SessionEnded { message, .. } => assert!(message.starts_with("Session has expired")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn expired_session_passes_when_only_logout_gates_validity() {
        let store = MemoryStore::new();
        let (user, token) = seed(&store, Role::NonAdmin, Duration::hours(8)).await;
        let later = now_utc() + Duration::hours(9);
        let lenient = Guard { enforce_expiry: false };
        let mut tx = store.begin().await.unwrap();
        let active = lenient
            .validate(tx.as_mut(), &token, later, "post a question")
            .await
            .unwrap();
        assert_eq!(active.user.id, user.id);
    }

    #[tokio::test]
    async fn ownership_compares_the_owner_key() {
        let store = MemoryStore::new();
        let (user, token) = seed(&store, Role::NonAdmin, Duration::hours(8)).await;
        let mut tx = store.begin().await.unwrap();
        let active = GUARD.validate(tx.as_mut(), &token, now_utc(), "x").await.unwrap();

        assert!(check_ownership(&active, user.id, "nope").is_ok());
        let err = check_ownership(&active, user.id + 1000, "Only the owner").unwrap_err();
        assert!(matches!(err, AppError::OwnershipViolation { code: "ATHR-003", .. }));
    }

    #[tokio::test]
    async fn only_admin_role_passes_admin_check() {
        let store = MemoryStore::new();
        let (_, admin_token) = seed(&store, Role::Admin, Duration::hours(8)).await;
        let (_, user_token) = seed(&store, Role::NonAdmin, Duration::hours(8)).await;
        let mut tx = store.begin().await.unwrap();

        let admin = GUARD.validate(tx.as_mut(), &admin_token, now_utc(), "x").await.unwrap();
        assert!(check_admin(&admin).is_ok());

        let plain = GUARD.validate(tx.as_mut(), &user_token, now_utc(), "x").await.unwrap();
        assert!(matches!(check_admin(&plain), Err(AppError::OwnershipViolation { .. })));
    }
}
