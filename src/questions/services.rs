use axum::extract::FromRef;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::guard::{check_ownership, Guard},
    error::AppError,
    state::AppState,
    store::{now_utc, NewQuestion, Question},
};

pub const MAX_QUESTION_LEN: usize = 500;

pub const CREATE_ACTION: &str = "post a question";
pub const EDIT_ACTION: &str = "edit the question";

pub fn question_not_found() -> AppError {
    AppError::not_found("QUES-001", "Entered question uuid does not exist")
}

/// Trim `raw` and reject empty or over-long content.
pub(crate) fn checked_content(raw: &str, max: usize) -> Result<String, AppError> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(AppError::Validation("Content cannot be empty".into()));
    }
    if content.chars().count() > max {
        return Err(AppError::Validation(format!(
            "Content cannot be longer than {max} characters"
        )));
    }
    Ok(content.to_string())
}

pub async fn create(state: &AppState, token: &str, content: &str) -> Result<Question, AppError> {
    let now = now_utc();
    let mut tx = state.store.begin().await?;
    let active = Guard::from_ref(state)
        .validate(tx.as_mut(), token, now, CREATE_ACTION)
        .await?;
    let content = checked_content(content, MAX_QUESTION_LEN)?;

    let question = tx
        .create_question(NewQuestion {
            uuid: Uuid::new_v4(),
            content,
            created_at: now,
            user_id: active.user.id,
        })
        .await?;
    tx.commit().await?;

    info!(question_uuid = %question.uuid, user_uuid = %active.user.uuid, "question created");
    Ok(question)
}

pub async fn edit(
    state: &AppState,
    token: &str,
    question_uuid: Uuid,
    content: &str,
) -> Result<Question, AppError> {
    let now = now_utc();
    let mut tx = state.store.begin().await?;
    let active = Guard::from_ref(state)
        .validate(tx.as_mut(), token, now, EDIT_ACTION)
        .await?;

    let mut question = tx
        .question_by_uuid(question_uuid)
        .await?
        .ok_or_else(question_not_found)?;
    check_ownership(&active, question.user_id, "Only the question owner can edit the question")?;

    question.content = checked_content(content, MAX_QUESTION_LEN)?;
    question.created_at = now;
    tx.update_question(&question).await?;
    tx.commit().await?;

    info!(question_uuid = %question.uuid, "question edited");
    Ok(question)
}

/// Delete a question and, with it, every answer posted under it.
pub async fn delete(state: &AppState, token: &str, question_uuid: Uuid) -> Result<Question, AppError> {
    let mut tx = state.store.begin().await?;
    let active = Guard::from_ref(state)
        .validate(tx.as_mut(), token, now_utc(), "delete the question")
        .await?;

    let question = tx
        .question_by_uuid(question_uuid)
        .await?
        .ok_or_else(question_not_found)?;
    check_ownership(&active, question.user_id, "Only the question owner can delete the question")?;

    tx.delete_question(question.id).await?;
    tx.commit().await?;

    info!(question_uuid = %question.uuid, "question deleted");
    Ok(question)
}

pub async fn list_all(state: &AppState, token: &str) -> Result<Vec<Question>, AppError> {
    let mut tx = state.store.begin().await?;
    Guard::from_ref(state)
        .validate(tx.as_mut(), token, now_utc(), "get all questions")
        .await?;
    let questions = tx.list_questions().await?;
    tx.commit().await?;
    Ok(questions)
}

pub async fn list_by_user(state: &AppState, token: &str, user_uuid: Uuid) -> Result<Vec<Question>, AppError> {
    let mut tx = state.store.begin().await?;
    Guard::from_ref(state)
        .validate(tx.as_mut(), token, now_utc(), "get all questions posted by a specific user")
        .await?;
    let user = tx.user_by_uuid(user_uuid).await?.ok_or_else(|| {
        AppError::not_found(
            "USR-001",
            "User with entered uuid whose question details are to be seen does not exist",
        )
    })?;
    let questions = tx.list_questions_by_user(user.id).await?;
    tx.commit().await?;
    Ok(questions)
}
