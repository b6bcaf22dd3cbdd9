use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    Answer, NewAnswer, NewQuestion, NewSession, NewUser, Question, Session, Store, StoreResult,
    StoreTx, User,
};
use crate::error::AppError;

const USER_COLUMNS: &str = "id, uuid, username, email, password_hash, salt, role, first_name, \
     last_name, about_me, dob, contact_number, country, created_at, last_login_at";

#[derive(Clone)]
pub struct PgStore {
    pub db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self.db.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

impl PgTx {
    async fn user_where(&mut self, clause: &str, bind: UserKey<'_>) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {clause}");
        let query = sqlx::query_as::<_, User>(&sql);
        let query = match bind {
            UserKey::Id(id) => query.bind(id),
            UserKey::Uuid(uuid) => query.bind(uuid),
            UserKey::Text(s) => query.bind(s),
        };
        Ok(query.fetch_optional(&mut *self.tx).await?)
    }
}

enum UserKey<'a> {
    Id(i64),
    Uuid(Uuid),
    Text(&'a str),
}

/// Map a unique violation on `users` to the matching signup conflict.
fn user_insert_error(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            user_conflict(db.constraint())
        }
        _ => e.into(),
    }
}

fn user_conflict(constraint: Option<&str>) -> AppError {
    match constraint {
        Some("users_email_key") => AppError::email_taken(),
        Some("users_uuid_key") => AppError::internal("duplicate user uuid"),
        _ => AppError::username_taken(),
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let PgTx { tx } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn user_by_id(&mut self, id: i64) -> StoreResult<Option<User>> {
        self.user_where("id = $1", UserKey::Id(id)).await
    }

    async fn user_by_uuid(&mut self, uuid: Uuid) -> StoreResult<Option<User>> {
        self.user_where("uuid = $1", UserKey::Uuid(uuid)).await
    }

    async fn user_by_username(&mut self, username: &str) -> StoreResult<Option<User>> {
        self.user_where("username = $1", UserKey::Text(username)).await
    }

    async fn user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        self.user_where("email = $1", UserKey::Text(email)).await
    }

    async fn create_user(&mut self, new: NewUser) -> StoreResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (uuid, username, email, password_hash, salt, role, first_name,
                               last_name, about_me, dob, contact_number, country, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(new.uuid)
            .bind(&new.username)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(&new.salt)
            .bind(new.role)
            .bind(&new.first_name)
            .bind(&new.last_name)
            .bind(&new.about_me)
            .bind(&new.dob)
            .bind(&new.contact_number)
            .bind(&new.country)
            .bind(new.created_at)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(user_insert_error)
    }

    async fn update_user(&mut self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET first_name = $2, last_name = $3, about_me = $4, dob = $5,
                   contact_number = $6, country = $7, last_login_at = $8
             WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.about_me)
        .bind(&user.dob)
        .bind(&user.contact_number)
        .bind(&user.country)
        .bind(user.last_login_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_user(&mut self, id: i64) -> StoreResult<()> {
        // sessions, questions and answers follow through ON DELETE CASCADE
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn session_by_token(&mut self, token: &str) -> StoreResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, token, user_id, login_at, expires_at, logout_at
            FROM sessions
            WHERE token = $1
            FOR UPDATE
            "#,
        )
        .bind(token)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(session)
    }

    async fn create_session(&mut self, new: NewSession) -> StoreResult<Session> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (token, user_id, login_at, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, token, user_id, login_at, expires_at, logout_at
            "#,
        )
        .bind(&new.token)
        .bind(new.user_id)
        .bind(new.login_at)
        .bind(new.expires_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(session)
    }

    async fn update_session(&mut self, session: &Session) -> StoreResult<()> {
        sqlx::query("UPDATE sessions SET expires_at = $2, logout_at = $3 WHERE id = $1")
            .bind(session.id)
            .bind(session.expires_at)
            .bind(session.logout_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn purge_sessions(
        &mut self,
        user_id: i64,
        expired_before: OffsetDateTime,
        ended_only: bool,
    ) -> StoreResult<u64> {
        let done = sqlx::query(
            r#"
            DELETE FROM sessions
             WHERE user_id = $1
               AND expires_at < $2
               AND (NOT $3 OR (logout_at IS NOT NULL AND logout_at > login_at))
            "#,
        )
        .bind(user_id)
        .bind(expired_before)
        .bind(ended_only)
        .execute(&mut *self.tx)
        .await?;
        Ok(done.rows_affected())
    }

    async fn question_by_uuid(&mut self, uuid: Uuid) -> StoreResult<Option<Question>> {
        let question = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, uuid, content, created_at, user_id
            FROM questions
            WHERE uuid = $1
            FOR UPDATE
            "#,
        )
        .bind(uuid)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(question)
    }

    async fn create_question(&mut self, new: NewQuestion) -> StoreResult<Question> {
        let question = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (uuid, content, created_at, user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, uuid, content, created_at, user_id
            "#,
        )
        .bind(new.uuid)
        .bind(&new.content)
        .bind(new.created_at)
        .bind(new.user_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(question)
    }

    async fn update_question(&mut self, question: &Question) -> StoreResult<()> {
        sqlx::query("UPDATE questions SET content = $2, created_at = $3 WHERE id = $1")
            .bind(question.id)
            .bind(&question.content)
            .bind(question.created_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_question(&mut self, id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn list_questions(&mut self) -> StoreResult<Vec<Question>> {
        let rows = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, uuid, content, created_at, user_id
            FROM questions
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }

    async fn list_questions_by_user(&mut self, user_id: i64) -> StoreResult<Vec<Question>> {
        let rows = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, uuid, content, created_at, user_id
            FROM questions
            WHERE user_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }

    async fn answer_by_uuid(&mut self, uuid: Uuid) -> StoreResult<Option<Answer>> {
        let answer = sqlx::query_as::<_, Answer>(
            r#"
            SELECT id, uuid, content, created_at, user_id, question_id
            FROM answers
            WHERE uuid = $1
            FOR UPDATE
            "#,
        )
        .bind(uuid)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(answer)
    }

    async fn create_answer(&mut self, new: NewAnswer) -> StoreResult<Answer> {
        let answer = sqlx::query_as::<_, Answer>(
            r#"
            INSERT INTO answers (uuid, content, created_at, user_id, question_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, uuid, content, created_at, user_id, question_id
            "#,
        )
        .bind(new.uuid)
        .bind(&new.content)
        .bind(new.created_at)
        .bind(new.user_id)
        .bind(new.question_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(answer)
    }

    async fn update_answer(&mut self, answer: &Answer) -> StoreResult<()> {
        sqlx::query("UPDATE answers SET content = $2, created_at = $3 WHERE id = $1")
            .bind(answer.id)
            .bind(&answer.content)
            .bind(answer.created_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_answer(&mut self, id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM answers WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn list_answers_by_question(&mut self, question_id: i64) -> StoreResult<Vec<Answer>> {
        let rows = sqlx::query_as::<_, Answer>(
            r#"
            SELECT id, uuid, content, created_at, user_id, question_id
            FROM answers
            WHERE question_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(question_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }
}
