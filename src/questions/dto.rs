use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::Question;

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub id: Uuid,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct QuestionDetails {
    pub id: Uuid,
    pub content: String,
}

impl From<Question> for QuestionDetails {
    fn from(q: Question) -> Self {
        Self {
            id: q.uuid,
            content: q.content,
        }
    }
}
