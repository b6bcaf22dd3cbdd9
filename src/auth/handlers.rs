use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{SigninRequest, SigninResponse, SignoutResponse, SignupRequest, SignupResponse},
        extractors::{AppJson, BearerToken},
        services::{self, Registration},
    },
    error::AppError,
    state::AppState,
    store::Role,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/user/signup", post(signup))
        .route("/user/signin", post(signin))
        .route("/user/signout", post(signout))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn signup(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let reg = Registration {
        username: payload.username,
        email: payload.email,
        password: payload.password,
        first_name: payload.first_name,
        last_name: payload.last_name,
        about_me: payload.about_me,
        dob: payload.dob,
        contact_number: payload.contact_number,
        country: payload.country,
    };
    // roles are fixed at creation; only the startup bootstrap creates admins
    let user = services::signup(&state, reg, Role::NonAdmin).await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            id: user.uuid,
            status: "USER SUCCESSFULLY REGISTERED",
        }),
    ))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn signin(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SigninRequest>,
) -> Result<(HeaderMap, Json<SigninResponse>), AppError> {
    let (user, session) = services::signin(&state, &payload.username, &payload.password).await?;

    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&session.token).map_err(AppError::internal)?;
    headers.insert("access-token", value);

    Ok((
        headers,
        Json(SigninResponse {
            id: user.uuid,
            message: "SIGNED IN SUCCESSFULLY",
            access_token: session.token,
            expires_at: session.expires_at,
        }),
    ))
}

#[instrument(skip_all)]
pub async fn signout(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<SignoutResponse>, AppError> {
    let id = services::signout(&state, &token).await?;
    Ok(Json(SignoutResponse {
        id,
        message: "SIGNED OUT SUCCESSFULLY",
    }))
}
