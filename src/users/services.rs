use axum::extract::FromRef;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::guard::{check_admin, Guard},
    error::AppError,
    state::AppState,
    store::{now_utc, User},
};

pub fn user_not_found() -> AppError {
    AppError::not_found("USR-001", "User with entered uuid does not exist")
}

pub async fn get_profile(state: &AppState, token: &str, user_uuid: Uuid) -> Result<User, AppError> {
    let mut tx = state.store.begin().await?;
    Guard::from_ref(state)
        .validate(tx.as_mut(), token, now_utc(), "get user details")
        .await?;
    let user = tx.user_by_uuid(user_uuid).await?.ok_or_else(user_not_found)?;
    tx.commit().await?;
    Ok(user)
}

/// Hard-delete a user together with their sessions, questions and answers.
///
/// The acting role comes from the session validated in this transaction.
pub async fn admin_delete(state: &AppState, token: &str, user_uuid: Uuid) -> Result<Uuid, AppError> {
    let mut tx = state.store.begin().await?;
    let active = Guard::from_ref(state)
        .validate(tx.as_mut(), token, now_utc(), "delete a user")
        .await?;

    let target = tx.user_by_uuid(user_uuid).await?.ok_or_else(user_not_found)?;
    check_admin(&active)?;

    tx.delete_user(target.id).await?;
    tx.commit().await?;

    info!(admin_uuid = %active.user.uuid, user_uuid = %target.uuid, "user deleted");
    Ok(target.uuid)
}
