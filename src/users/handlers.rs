use axum::{
    extract::State,
    routing::{delete, get},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{UserDeleteResponse, UserDetailsResponse},
    services,
};
use crate::{
    auth::extractors::{BearerToken, EntityId},
    error::AppError,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/userprofile/:user_id", get(get_profile))
        .route("/admin/user/:user_id", delete(delete_user))
}

#[instrument(skip(state, token))]
pub async fn get_profile(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    EntityId(user_id): EntityId,
) -> Result<Json<UserDetailsResponse>, AppError> {
    let user = services::get_profile(&state, &token, user_id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, token))]
pub async fn delete_user(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    EntityId(user_id): EntityId,
) -> Result<Json<UserDeleteResponse>, AppError> {
    let id = services::admin_delete(&state, &token, user_id).await?;
    Ok(Json(UserDeleteResponse {
        id,
        status: "USER SUCCESSFULLY DELETED",
    }))
}
