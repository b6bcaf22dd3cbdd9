use axum::extract::FromRef;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::guard::{check_ownership, Guard},
    error::AppError,
    questions::services::checked_content,
    state::AppState,
    store::{now_utc, Answer, NewAnswer, Question},
};

pub const MAX_ANSWER_LEN: usize = 255;

pub const CREATE_ACTION: &str = "post an answer";
pub const EDIT_ACTION: &str = "edit an answer";

pub fn answer_not_found() -> AppError {
    AppError::not_found("ANS-001", "Entered answer uuid does not exist")
}

/// Post an answer under the question `question_uuid`.
pub async fn create(
    state: &AppState,
    token: &str,
    question_uuid: Uuid,
    content: &str,
) -> Result<Answer, AppError> {
    let now = now_utc();
    let mut tx = state.store.begin().await?;
    let active = Guard::from_ref(state)
        .validate(tx.as_mut(), token, now, CREATE_ACTION)
        .await?;

    let question = tx
        .question_by_uuid(question_uuid)
        .await?
        .ok_or_else(|| AppError::not_found("QUES-001", "The question entered is invalid"))?;
    let content = checked_content(content, MAX_ANSWER_LEN)?;

    let answer = tx
        .create_answer(NewAnswer {
            uuid: Uuid::new_v4(),
            content,
            created_at: now,
            user_id: active.user.id,
            question_id: question.id,
        })
        .await?;
    tx.commit().await?;

    info!(answer_uuid = %answer.uuid, question_uuid = %question.uuid, "answer created");
    Ok(answer)
}

pub async fn edit(
    state: &AppState,
    token: &str,
    answer_uuid: Uuid,
    content: &str,
) -> Result<Answer, AppError> {
    let now = now_utc();
    let mut tx = state.store.begin().await?;
    let active = Guard::from_ref(state)
        .validate(tx.as_mut(), token, now, EDIT_ACTION)
        .await?;

    let mut answer = tx
        .answer_by_uuid(answer_uuid)
        .await?
        .ok_or_else(answer_not_found)?;
    check_ownership(&active, answer.user_id, "Only the answer owner can edit the answer")?;

    answer.content = checked_content(content, MAX_ANSWER_LEN)?;
    answer.created_at = now;
    tx.update_answer(&answer).await?;
    tx.commit().await?;

    info!(answer_uuid = %answer.uuid, "answer edited");
    Ok(answer)
}

pub async fn delete(state: &AppState, token: &str, answer_uuid: Uuid) -> Result<Answer, AppError> {
    let mut tx = state.store.begin().await?;
    let active = Guard::from_ref(state)
        .validate(tx.as_mut(), token, now_utc(), "delete an answer")
        .await?;

    let answer = tx
        .answer_by_uuid(answer_uuid)
        .await?
        .ok_or_else(answer_not_found)?;
    check_ownership(&active, answer.user_id, "Only the answer owner can delete the answer")?;

    tx.delete_answer(answer.id).await?;
    tx.commit().await?;

    info!(answer_uuid = %answer.uuid, "answer deleted");
    Ok(answer)
}

/// All answers to a question, oldest first, along with the question itself.
pub async fn list_by_question(
    state: &AppState,
    token: &str,
    question_uuid: Uuid,
) -> Result<(Question, Vec<Answer>), AppError> {
    let mut tx = state.store.begin().await?;
    Guard::from_ref(state)
        .validate(tx.as_mut(), token, now_utc(), "get the answers")
        .await?;

    let question = tx
        .question_by_uuid(question_uuid)
        .await?
        .ok_or_else(|| {
            AppError::not_found(
                "QUES-001",
                "The question with entered uuid whose details are to be seen does not exist",
            )
        })?;
    let answers = tx.list_answers_by_question(question.id).await?;
    tx.commit().await?;
    Ok((question, answers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questions::services as questions;
    use crate::store::Role;
    use crate::testutil::signed_in;

    #[tokio::test]
    async fn answer_belongs_to_its_author_and_question() {
        let state = AppState::fake();
        let (alice, a) = signed_in(&state, "alice", Role::NonAdmin).await;
        let (bob, b) = signed_in(&state, "bob", Role::NonAdmin).await;
        let q = questions::create(&state, &a, "Q1").await.unwrap();

        let ans = create(&state, &b, q.uuid, "Ans1").await.unwrap();
        assert_eq!(ans.user_id, bob.id);
        assert_eq!(ans.question_id, q.id);
        assert_ne!(ans.user_id, alice.id);
    }

    #[tokio::test]
    async fn answering_a_missing_question_is_not_found() {
        let state = AppState::fake();
        let (_, a) = signed_in(&state, "alice", Role::NonAdmin).await;
        let err = create(&state, &a, Uuid::new_v4(), "Ans").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { code: "QUES-001", .. }));
    }

    #[tokio::test]
    async fn only_the_author_edits_or_deletes() {
        let state = AppState::fake();
        let (_, a) = signed_in(&state, "alice", Role::NonAdmin).await;
        let (_, b) = signed_in(&state, "bob", Role::NonAdmin).await;
        let q = questions::create(&state, &a, "Q1").await.unwrap();
        let ans = create(&state, &a, q.uuid, "Ans1").await.unwrap();

        let err = edit(&state, &b, ans.uuid, "hack").await.unwrap_err();
        match err {
            AppError::OwnershipViolation { code, message } => {
                assert_eq!(code, "ATHR-003");
                assert_eq!(message, "Only the answer owner can edit the answer");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            delete(&state, &b, ans.uuid).await,
            Err(AppError::OwnershipViolation { .. })
        ));

        let edited = edit(&state, &a, ans.uuid, "Ans1 (fixed)").await.unwrap();
        assert_eq!(edited.content, "Ans1 (fixed)");
        assert_eq!(edited.question_id, ans.question_id);

        delete(&state, &a, ans.uuid).await.unwrap();
        let err = edit(&state, &a, ans.uuid, "again").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { code: "ANS-001", .. }));
    }

    #[tokio::test]
    async fn deleting_a_question_removes_its_answers() {
        let state = AppState::fake();
        let (_, a) = signed_in(&state, "alice", Role::NonAdmin).await;
        let (_, b) = signed_in(&state, "bob", Role::NonAdmin).await;
        let q = questions::create(&state, &a, "Q1").await.unwrap();
        let mine = create(&state, &a, q.uuid, "first").await.unwrap();
        let theirs = create(&state, &b, q.uuid, "second").await.unwrap();

        let (_, listed) = list_by_question(&state, &b, q.uuid).await.unwrap();
        let contents: Vec<_> = listed.iter().map(|x| x.content.as_str()).collect();
        assert_eq!(contents, ["first", "second"]);

        questions::delete(&state, &a, q.uuid).await.unwrap();

        for id in [mine.uuid, theirs.uuid] {
            let err = edit(&state, &b, id, "x").await.unwrap_err();
            assert!(matches!(err, AppError::NotFound { code: "ANS-001", .. }));
        }
        match list_by_question(&state, &b, q.uuid).await.unwrap_err() {
            AppError::NotFound { code, message } => {
                assert_eq!(code, "QUES-001");
                assert_eq!(
                    message,
                    "The question with entered uuid whose details are to be seen does not exist"
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn any_signed_in_user_reads_answers() {
        let state = AppState::fake();
        let (_, a) = signed_in(&state, "alice", Role::NonAdmin).await;
        let (_, b) = signed_in(&state, "bob", Role::NonAdmin).await;
        let q = questions::create(&state, &a, "Q1").await.unwrap();
        create(&state, &a, q.uuid, "Ans1").await.unwrap();

        let (question, answers) = list_by_question(&state, &b, q.uuid).await.unwrap();
        assert_eq!(question.content, "Q1");
        assert_eq!(answers.len(), 1);

        let err = list_by_question(&state, "bogus", q.uuid).await.unwrap_err();
        assert!(matches!(err, AppError::AuthRequired { .. }));
    }
}
