use serde::Serialize;
use uuid::Uuid;

use crate::store::User;

#[derive(Debug, Serialize)]
pub struct UserDetailsResponse {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_name: String,
    pub email_address: String,
    pub country: Option<String>,
    pub about_me: Option<String>,
    pub dob: Option<String>,
    pub contact_number: Option<String>,
}

impl From<User> for UserDetailsResponse {
    fn from(u: User) -> Self {
        Self {
            first_name: u.first_name,
            last_name: u.last_name,
            user_name: u.username,
            email_address: u.email,
            country: u.country,
            about_me: u.about_me,
            dob: u.dob,
            contact_number: u.contact_number,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserDeleteResponse {
    pub id: Uuid,
    pub status: &'static str,
}
