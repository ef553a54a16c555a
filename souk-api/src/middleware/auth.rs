use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserClaims {
    pub sub: String,
    #[serde(default)]
    pub role: Option<String>,
    pub exp: usize,
}

/// The caller, as established by a verified bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Set on routes where a token is accepted but not required.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaybeUser(pub Option<AuthUser>);

fn verify(headers: &HeaderMap, secret: &str) -> Option<AuthUser> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?
        .strip_prefix("Bearer ")?;

    let token_data = decode::<UserClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;

    let user_id = token_data.claims.sub.parse().ok()?;
    Some(AuthUser { user_id })
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let user = verify(req.headers(), &state.auth.secret).ok_or(StatusCode::UNAUTHORIZED)?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Attaches the caller when a valid token is present. A missing or invalid
/// token is not an error here.
pub async fn optional_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let user = verify(req.headers(), &state.auth.secret);
    req.extensions_mut().insert(MaybeUser(user));
    next.run(req).await
}
