use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{AnswerDetails, AnswerRequest, AnswerResponse},
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
    Router::new().route("/answer/all/:question_id", get(list_by_question))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/question/:question_id/answer/create", post(create_answer))
        .route("/answer/edit/:answer_id", put(edit_answer))
        .route("/answer/delete/:answer_id", delete(delete_answer))
}

#[instrument(skip(state, token, body))]
pub async fn create_answer(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    EntityId(question_id): EntityId,
    body: Result<AppJson<AnswerRequest>, AppError>,
) -> Result<(StatusCode, Json<AnswerResponse>), AppError> {
    let AppJson(body) = match body {
        Ok(body) => body,
        Err(e) => return Err(after_validation(&state, &token, services::CREATE_ACTION, e).await),
    };
    let answer = services::create(&state, &token, question_id, &body.content).await?;
    Ok((
        StatusCode::CREATED,
        Json(AnswerResponse {
            id: answer.uuid,
            status: "ANSWER CREATED",
        }),
    ))
}

#[instrument(skip(state, token, body))]
pub async fn edit_answer(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    EntityId(answer_id): EntityId,
    body: Result<AppJson<AnswerRequest>, AppError>,
) -> Result<Json<AnswerResponse>, AppError> {
    let AppJson(body) = match body {
        Ok(body) => body,
        Err(e) => return Err(after_validation(&state, &token, services::EDIT_ACTION, e).await),
    };
    let answer = services::edit(&state, &token, answer_id, &body.content).await?;
    Ok(Json(AnswerResponse {
        id: answer.uuid,
        status: "ANSWER EDITED",
    }))
}

#[instrument(skip(state, token))]
pub async fn delete_answer(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    EntityId(answer_id): EntityId,
) -> Result<Json<AnswerResponse>, AppError> {
    let answer = services::delete(&state, &token, answer_id).await?;
    Ok(Json(AnswerResponse {
        id: answer.uuid,
        status: "ANSWER DELETED",
    }))
}

#[instrument(skip(state, token))]
pub async fn list_by_question(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    EntityId(question_id): EntityId,
) -> Result<Json<Vec<AnswerDetails>>, AppError> {
    let (question, answers) = services::list_by_question(&state, &token, question_id).await?;
    let items = answers
        .into_iter()
        .map(|a| AnswerDetails {
            id: a.uuid,
            question_content: question.content.clone(),
            answer_content: a.content,
        })
        .collect();
    Ok(Json(items))
}
