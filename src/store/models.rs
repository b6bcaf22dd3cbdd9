use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Closed set of user roles, stored as the `user_role` postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    Admin,
    NonAdmin,
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub uuid: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 digest, base64
    #[serde(skip_serializing)]
    pub salt: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub about_me: Option<String>,
    pub dob: Option<String>,
    pub contact_number: Option<String>,
    pub country: Option<String>,
    pub created_at: OffsetDateTime,
    pub last_login_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub uuid: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub salt: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub about_me: Option<String>,
    pub dob: Option<String>,
    pub contact_number: Option<String>,
    pub country: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: i64,
    pub token: String,
    pub user_id: i64,
    pub login_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub logout_at: Option<OffsetDateTime>,
}

impl Session {
    /// Signed out iff `logout_at` is set strictly after `login_at`.
    pub fn is_terminated(&self) -> bool {
        matches!(self.logout_at, Some(out) if out > self.login_at)
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub token: String,
    pub user_id: i64,
    pub login_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: i64,
    pub uuid: Uuid,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub user_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub uuid: Uuid,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Answer {
    pub id: i64,
    pub uuid: Uuid,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub user_id: i64,
    pub question_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub uuid: Uuid,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub user_id: i64,
    pub question_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn session(logout_offset: Option<Duration>) -> Session {
        let login_at = OffsetDateTime::now_utc();
        Session {
            id: 1,
            token: "t".into(),
            user_id: 1,
            login_at,
            expires_at: login_at + Duration::hours(8),
            logout_at: logout_offset.map(|d| login_at + d),
        }
    }

    #[test]
    fn session_without_logout_is_active() {
        assert!(!session(None).is_terminated());
    }

    #[test]
    fn logout_not_after_login_keeps_session_active() {
        assert!(!session(Some(Duration::ZERO)).is_terminated());
        assert!(!session(Some(Duration::seconds(-5))).is_terminated());
    }

    #[test]
    fn logout_after_login_terminates() {
        assert!(session(Some(Duration::microseconds(1))).is_terminated());
    }

    #[test]
    fn expiry_is_inclusive_of_the_deadline() {
        let s = session(None);
        assert!(!s.is_expired(s.expires_at - Duration::seconds(1)));
        assert!(s.is_expired(s.expires_at));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::NonAdmin).unwrap(), "\"nonadmin\"");
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }
}
