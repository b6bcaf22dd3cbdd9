use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{
    Answer, NewAnswer, NewQuestion, NewSession, NewUser, Question, Session, Store, StoreResult,
    StoreTx, User,
};
use crate::error::AppError;

/// Process-local store used when no database is configured.
///
/// A transaction holds the lock for its whole lifetime and edits a copy of
/// the tables, so transactions run one at a time and an uncommitted one
/// leaves no trace.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Clone, Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    sessions: BTreeMap<i64, Session>,
    questions: BTreeMap<i64, Question>,
    answers: BTreeMap<i64, Answer>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.tables.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
}

fn missing(what: &str, id: i64) -> AppError {
    AppError::internal(format!("{what} {id} vanished inside its transaction"))
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }

    async fn user_by_id(&mut self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.work.users.get(&id).cloned())
    }

    async fn user_by_uuid(&mut self, uuid: Uuid) -> StoreResult<Option<User>> {
        Ok(self.work.users.values().find(|u| u.uuid == uuid).cloned())
    }

    async fn user_by_username(&mut self, username: &str) -> StoreResult<Option<User>> {
        Ok(self.work.users.values().find(|u| u.username == username).cloned())
    }

    async fn user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.work.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&mut self, new: NewUser) -> StoreResult<User> {
        let users = || self.work.users.values();
        if users().any(|u| u.username == new.username) {
            return Err(AppError::username_taken());
        }
        if users().any(|u| u.email == new.email) {
            return Err(AppError::email_taken());
        }
        if users().any(|u| u.uuid == new.uuid) {
            return Err(AppError::internal("duplicate user uuid"));
        }
        let id = self.work.next_id();
        let user = User {
            id,
            uuid: new.uuid,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            salt: new.salt,
            role: new.role,
            first_name: new.first_name,
            last_name: new.last_name,
            about_me: new.about_me,
            dob: new.dob,
            contact_number: new.contact_number,
            country: new.country,
            created_at: new.created_at,
            last_login_at: None,
        };
        self.work.users.insert(id, user.clone());
        Ok(user)
    }

    async fn update_user(&mut self, user: &User) -> StoreResult<()> {
        let row = self
            .work
            .users
            .get_mut(&user.id)
            .ok_or_else(|| missing("user", user.id))?;
        row.first_name = user.first_name.clone();
        row.last_name = user.last_name.clone();
        row.about_me = user.about_me.clone();
        row.dob = user.dob.clone();
        row.contact_number = user.contact_number.clone();
        row.country = user.country.clone();
        row.last_login_at = user.last_login_at;
        Ok(())
    }

    async fn delete_user(&mut self, id: i64) -> StoreResult<()> {
        let t = &mut self.work;
        t.users.remove(&id);
        t.sessions.retain(|_, s| s.user_id != id);
        let owned: Vec<i64> = t
            .questions
            .values()
            .filter(|q| q.user_id == id)
            .map(|q| q.id)
            .collect();
        t.questions.retain(|_, q| q.user_id != id);
        t.answers
            .retain(|_, a| a.user_id != id && !owned.contains(&a.question_id));
        Ok(())
    }

    async fn session_by_token(&mut self, token: &str) -> StoreResult<Option<Session>> {
        Ok(self.work.sessions.values().find(|s| s.token == token).cloned())
    }

    async fn create_session(&mut self, new: NewSession) -> StoreResult<Session> {
        if self.work.sessions.values().any(|s| s.token == new.token) {
            return Err(AppError::internal("duplicate session token"));
        }
        let id = self.work.next_id();
        let session = Session {
            id,
            token: new.token,
            user_id: new.user_id,
            login_at: new.login_at,
            expires_at: new.expires_at,
            logout_at: None,
        };
        self.work.sessions.insert(id, session.clone());
        Ok(session)
    }

    async fn update_session(&mut self, session: &Session) -> StoreResult<()> {
        let row = self
            .work
            .sessions
            .get_mut(&session.id)
            .ok_or_else(|| missing("session", session.id))?;
        row.expires_at = session.expires_at;
        row.logout_at = session.logout_at;
        Ok(())
    }

    async fn purge_sessions(
        &mut self,
        user_id: i64,
        expired_before: OffsetDateTime,
        ended_only: bool,
    ) -> StoreResult<u64> {
        let before = self.work.sessions.len();
        self.work.sessions.retain(|_, s| {
            let stale = s.user_id == user_id
                && s.expires_at < expired_before
                && (!ended_only || s.is_terminated());
            !stale
        });
        Ok((before - self.work.sessions.len()) as u64)
    }

    async fn question_by_uuid(&mut self, uuid: Uuid) -> StoreResult<Option<Question>> {
        Ok(self.work.questions.values().find(|q| q.uuid == uuid).cloned())
    }

    async fn create_question(&mut self, new: NewQuestion) -> StoreResult<Question> {
        let id = self.work.next_id();
        let question = Question {
            id,
            uuid: new.uuid,
            content: new.content,
            created_at: new.created_at,
            user_id: new.user_id,
        };
        self.work.questions.insert(id, question.clone());
        Ok(question)
    }

    async fn update_question(&mut self, question: &Question) -> StoreResult<()> {
        let row = self
            .work
            .questions
            .get_mut(&question.id)
            .ok_or_else(|| missing("question", question.id))?;
        row.content = question.content.clone();
        row.created_at = question.created_at;
        Ok(())
    }

    async fn delete_question(&mut self, id: i64) -> StoreResult<()> {
        self.work.questions.remove(&id);
        self.work.answers.retain(|_, a| a.question_id != id);
        Ok(())
    }

    async fn list_questions(&mut self) -> StoreResult<Vec<Question>> {
        Ok(self.work.questions.values().cloned().collect())
    }

    async fn list_questions_by_user(&mut self, user_id: i64) -> StoreResult<Vec<Question>> {
        Ok(self
            .work
            .questions
            .values()
            .filter(|q| q.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn answer_by_uuid(&mut self, uuid: Uuid) -> StoreResult<Option<Answer>> {
        Ok(self.work.answers.values().find(|a| a.uuid == uuid).cloned())
    }

    async fn create_answer(&mut self, new: NewAnswer) -> StoreResult<Answer> {
        if !self.work.questions.contains_key(&new.question_id) {
            return Err(missing("question", new.question_id));
        }
        let id = self.work.next_id();
        let answer = Answer {
            id,
            uuid: new.uuid,
            content: new.content,
            created_at: new.created_at,
            user_id: new.user_id,
            question_id: new.question_id,
        };
        self.work.answers.insert(id, answer.clone());
        Ok(answer)
    }

    async fn update_answer(&mut self, answer: &Answer) -> StoreResult<()> {
        let row = self
            .work
            .answers
            .get_mut(&answer.id)
            .ok_or_else(|| missing("answer", answer.id))?;
        row.content = answer.content.clone();
        row.created_at = answer.created_at;
        Ok(())
    }

    async fn delete_answer(&mut self, id: i64) -> StoreResult<()> {
        self.work.answers.remove(&id);
        Ok(())
    }

    async fn list_answers_by_question(&mut self, question_id: i64) -> StoreResult<Vec<Answer>> {
        Ok(self
            .work
            .answers
            .values()
            .filter(|a| a.question_id == question_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{now_utc, Role};

    fn new_user(name: &str) -> NewUser {
        NewUser {
            uuid: Uuid::new_v4(),
            username: name.into(),
            email: format!("{name}@example.com"),
            password_hash: "digest".into(),
            salt: "salt".into(),
            role: Role::NonAdmin,
            first_name: None,
            last_name: None,
            about_me: None,
            dob: None,
            contact_number: None,
            country: None,
            created_at: now_utc(),
        }
    }

    #[tokio::test]
    async fn uncommitted_writes_are_discarded() {
        let store = MemoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.create_user(new_user("ghost")).await.unwrap();
            // dropped without commit
        }
        let mut tx = store.begin().await.unwrap();
        assert!(tx.user_by_username("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn committed_writes_are_visible_to_later_transactions() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let user = tx.create_user(new_user("alice")).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let found = tx.user_by_uuid(user.uuid).await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.email, "alice@example.com");
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.create_user(new_user("alice")).await.unwrap();
        let err = tx.create_user(new_user("alice")).await.unwrap_err();
        assert!(matches!(err, AppError::SignupConflict { code: "SGR-001", .. }));
    }

    #[tokio::test]
    async fn duplicate_email_is_reported_as_email_conflict() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.create_user(new_user("alice")).await.unwrap();
        let mut other = new_user("alicia");
        other.email = "alice@example.com".into();
        let err = tx.create_user(other).await.unwrap_err();
        match err {
            AppError::SignupConflict { code, message } => {
                assert_eq!(code, "SGR-002");
                assert_eq!(message, "This user has already been registered, try with any other emailId");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn deleting_a_user_cascades_to_their_content() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let alice = tx.create_user(new_user("alice")).await.unwrap();
        let bob = tx.create_user(new_user("bob")).await.unwrap();
        let now = now_utc();
        let q = tx
            .create_question(NewQuestion {
                uuid: Uuid::new_v4(),
                content: "Q".into(),
                created_at: now,
                user_id: alice.id,
            })
            .await
            .unwrap();
        let bobs_answer = tx
            .create_answer(NewAnswer {
                uuid: Uuid::new_v4(),
                content: "A".into(),
                created_at: now,
                user_id: bob.id,
                question_id: q.id,
            })
            .await
            .unwrap();
        tx.create_session(NewSession {
            token: "tok".into(),
            user_id: alice.id,
            login_at: now,
            expires_at: now,
        })
        .await
        .unwrap();

        tx.delete_user(alice.id).await.unwrap();

        assert!(tx.user_by_id(alice.id).await.unwrap().is_none());
        assert!(tx.session_by_token("tok").await.unwrap().is_none());
        assert!(tx.question_by_uuid(q.uuid).await.unwrap().is_none());
        assert!(tx.answer_by_uuid(bobs_answer.uuid).await.unwrap().is_none());
        assert!(tx.user_by_id(bob.id).await.unwrap().is_some());
    }
}
