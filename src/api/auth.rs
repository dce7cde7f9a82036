//! Bearer token verification.
//!
//! Tokens are issued elsewhere; this service checks the HS256 signature and
//! expiry, refuses accounts an admin has deactivated, and turns the claims
//! into a [`Principal`].

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::AppState;
use crate::domain::aggregates::{Role, UserStatus};
use crate::service::Principal;
use crate::{EcommerceError, Result};

const ACCESS_TOKEN_COOKIE: &str = "accessToken";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: usize,
}

pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self { key: DecodingKey::from_secret(secret.as_bytes()), validation: Validation::new(Algorithm::HS256) }
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "token rejected");
                EcommerceError::Unauthorized("Invalid or expired token")
            })
    }
}

fn bearer(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn cookie<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = EcommerceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let parts = &*parts;
        let token = bearer(parts)
            .or_else(|| cookie(parts, ACCESS_TOKEN_COOKIE))
            .ok_or(EcommerceError::Unauthorized("Provide an access token"))?;
        let claims = state.jwt.verify(token)?;
        // Unknown subjects are accounts not mirrored into this store yet.
        if let Some(user) = state.store.get_user(claims.sub).await? {
            if user.status != UserStatus::Active {
                debug!(user_id = %user.id, status = %user.status, "token of inactive account rejected");
                return Err(EcommerceError::Forbidden("Account is not active"));
            }
        }
        Ok(Principal::new(claims.sub, claims.role))
    }
}

/// A principal holding the admin role.
#[derive(Clone, Copy, Debug)]
pub struct Admin(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for Admin {
    type Rejection = EcommerceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let principal = Principal::from_request_parts(parts, state).await?;
        if !principal.is_admin() {
            return Err(EcommerceError::Forbidden("Admin access required"));
        }
        Ok(Self(principal))
    }
}
