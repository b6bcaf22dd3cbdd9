//! Record store for users, sessions, questions and answers.
//!
//! Every service call opens one [`StoreTx`], performs its lookups and writes
//! through it and commits at the end. Dropping a transaction without
//! committing discards its writes.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;

pub mod memory;
pub mod models;
pub mod postgres;

pub use memory::MemoryStore;
pub use models::{Answer, NewAnswer, NewQuestion, NewSession, NewUser, Question, Role, Session, User};
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, AppError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;
}

#[async_trait]
pub trait StoreTx: Send {
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    // users
    async fn user_by_id(&mut self, id: i64) -> StoreResult<Option<User>>;
    async fn user_by_uuid(&mut self, uuid: Uuid) -> StoreResult<Option<User>>;
    async fn user_by_username(&mut self, username: &str) -> StoreResult<Option<User>>;
    async fn user_by_email(&mut self, email: &str) -> StoreResult<Option<User>>;
    async fn create_user(&mut self, new: NewUser) -> StoreResult<User>;
    async fn update_user(&mut self, user: &User) -> StoreResult<()>;
    /// Removes the user together with their sessions, questions and answers.
    async fn delete_user(&mut self, id: i64) -> StoreResult<()>;

    // sessions
    async fn session_by_token(&mut self, token: &str) -> StoreResult<Option<Session>>;
    async fn create_session(&mut self, new: NewSession) -> StoreResult<Session>;
    async fn update_session(&mut self, session: &Session) -> StoreResult<()>;
    /// Deletes the user's sessions that expired before `expired_before`.
    /// With `ended_only`, sessions that were never signed out are kept.
    async fn purge_sessions(
        &mut self,
        user_id: i64,
        expired_before: OffsetDateTime,
        ended_only: bool,
    ) -> StoreResult<u64>;

    // questions
    async fn question_by_uuid(&mut self, uuid: Uuid) -> StoreResult<Option<Question>>;
    async fn create_question(&mut self, new: NewQuestion) -> StoreResult<Question>;
    async fn update_question(&mut self, question: &Question) -> StoreResult<()>;
    /// Removes the question and all of its answers.
    async fn delete_question(&mut self, id: i64) -> StoreResult<()>;
    async fn list_questions(&mut self) -> StoreResult<Vec<Question>>;
    async fn list_questions_by_user(&mut self, user_id: i64) -> StoreResult<Vec<Question>>;

    // answers
    async fn answer_by_uuid(&mut self, uuid: Uuid) -> StoreResult<Option<Answer>>;
    async fn create_answer(&mut self, new: NewAnswer) -> StoreResult<Answer>;
    async fn update_answer(&mut self, answer: &Answer) -> StoreResult<()>;
    async fn delete_answer(&mut self, id: i64) -> StoreResult<()>;
    async fn list_answers_by_question(&mut self, question_id: i64) -> StoreResult<Vec<Answer>>;
}

/// Current UTC time at microsecond precision, the resolution of `TIMESTAMPTZ`.
pub fn now_utc() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now)
}
