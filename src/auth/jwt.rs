use axum::extract::FromRef;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{config::JwtConfig, state::AppState};

/// JWT payload carried by a bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // user uuid
    pub jti: Uuid, // unique per sign-in
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}

/// Token issuer: signs the opaque bearer tokens handed out at sign-in.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub issuer: String,
    pub audience: String,
    pub session_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            session_ttl: Duration::hours(state.config.session.ttl_hours),
        }
    }
}

impl JwtKeys {
    /// Sign a token for `user_uuid` valid from `now` until `expires_at`.
    pub fn sign(
        &self,
        user_uuid: Uuid,
        now: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<String> {
        let claims = Claims {
            sub: user_uuid,
            jti: Uuid::new_v4(),
            iat: now.unix_timestamp() as usize,
            exp: expires_at.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_uuid = %user_uuid, "jwt signed");
        Ok(token)
    }
}
