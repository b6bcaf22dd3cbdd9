//! Fixtures shared by the service tests.

use crate::{
    auth::services::{signin, signup, Registration},
    state::AppState,
    store::{Role, User},
};

/// Register `name` with the given role and sign in; returns the user and a bearer token.
pub async fn signed_in(state: &AppState, name: &str, role: Role) -> (User, String) {
    let reg = Registration {
        username: name.into(),
        email: format!("{name}@example.com"),
        password: Some(format!("{name}-pw")),
        ..Registration::default()
    };
    signup(state, reg, role).await.expect("signup");
    let (user, session) = signin(state, name, &format!("{name}-pw"))
        .await
        .expect("signin");
    (user, session.token)
}
