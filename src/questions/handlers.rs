use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{QuestionDetails, QuestionRequest, QuestionResponse},
    services,
};
use crate::{
    auth::{
        extractors::{AppJson, BearerToken, EntityId},
        guard::after_validation,
    },
    error::AppError,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/question/all", get(list_all))
        .route("/question/all/:user_id", get(list_by_user))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/question/create", post(create_question))
        .route("/question/edit/:question_id", put(edit_question))
        .route("/question/delete/:question_id", delete(delete_question))
}

#[instrument(skip(state, token, body))]
pub async fn create_question(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    body: Result<AppJson<QuestionRequest>, AppError>,
) -> Result<(StatusCode, Json<QuestionResponse>), AppError> {
    let AppJson(body) = match body {
        Ok(body) => body,
        Err(e) => return Err(after_validation(&state, &token, services::CREATE_ACTION, e).await),
    };
    let question = services::create(&state, &token, &body.content).await?;
    Ok((
        StatusCode::CREATED,
        Json(QuestionResponse {
            id: question.uuid,
            status: "QUESTION CREATED",
        }),
    ))
}

#[instrument(skip(state, token, body))]
pub async fn edit_question(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    EntityId(id): EntityId,
    body: Result<AppJson<QuestionRequest>, AppError>,
) -> Result<Json<QuestionResponse>, AppError> {
    let AppJson(body) = match body {
        Ok(body) => body,
        Err(e) => return Err(after_validation(&state, &token, services::EDIT_ACTION, e).await),
    };
    let question = services::edit(&state, &token, id, &body.content).await?;
    Ok(Json(QuestionResponse {
        id: question.uuid,
        status: "QUESTION EDITED",
    }))
}

#[instrument(skip(state, token))]
pub async fn delete_question(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    EntityId(id): EntityId,
) -> Result<Json<QuestionResponse>, AppError> {
    let question = services::delete(&state, &token, id).await?;
    Ok(Json(QuestionResponse {
        id: question.uuid,
        status: "QUESTION DELETED",
    }))
}

#[instrument(skip(state, token))]
pub async fn list_all(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<Vec<QuestionDetails>>, AppError> {
    let questions = services::list_all(&state, &token).await?;
    Ok(Json(questions.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, token))]
pub async fn list_by_user(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    EntityId(id): EntityId,
) -> Result<Json<Vec<QuestionDetails>>, AppError> {
    let questions = services::list_by_user(&state, &token, id).await?;
    Ok(Json(questions.into_iter().map(Into::into).collect()))
}
