//! Token-check middleware. The validator is a trait so a real issuer/verifier
//! can be swapped in later; the default implementation matches the prefix
//! convention `admin-`/`user-` used by the service's own `/token/*` endpoints.

use crate::app::AppState;
use crate::error::AdapterError;
use axum::extract::{Request, State};
use axum::http::header::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse as _, Response};
use uuid::Uuid;

const TOKEN_HEADER: &str = "token";
const ADMIN_PREFIX: &str = "admin-";
const USER_PREFIX: &str = "user-";

/// Checks whether a bearer token grants admin or user permissions.
///
/// Implementations must not fail outwardly for a malformed token; they simply
/// answer `false`. A real deployment would back this with a token store or a
/// JWT verifier; the default [`PrefixTokenValidator`] is a demo-grade stand-in.
pub trait TokenValidator: Send + Sync {
    fn is_admin_token(&self, token: &str) -> bool;
    fn is_user_token(&self, token: &str) -> bool;
    fn mint_admin_token(&self) -> String;
    fn mint_user_token(&self) -> String;
}

/// Classifies tokens by the `admin-`/`user-` prefix convention.
#[derive(Default)]
pub struct PrefixTokenValidator;

impl TokenValidator for PrefixTokenValidator {
    fn is_admin_token(&self, token: &str) -> bool {
        token.starts_with(ADMIN_PREFIX)
    }

    fn is_user_token(&self, token: &str) -> bool {
        token.starts_with(USER_PREFIX)
    }

    fn mint_admin_token(&self) -> String {
        format!("{ADMIN_PREFIX}{}", Uuid::new_v4())
    }

    fn mint_user_token(&self) -> String {
        format!("{USER_PREFIX}{}", Uuid::new_v4())
    }
}

fn extract_token(headers: &HeaderMap) -> Option<&str> {
    headers.get(TOKEN_HEADER)?.to_str().ok()
}

/// Requires an admin token: 401 if absent, 403 if present but not admin.
pub async fn require_admin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    match extract_token(request.headers()) {
        None => AdapterError::Unauthorized.into_response(),
        Some(token) if state.token_validator.is_admin_token(token) => next.run(request).await,
        Some(_) => AdapterError::Forbidden.into_response(),
    }
}

/// Requires a user token: 401 if absent, 403 if present but not user.
pub async fn require_user(State(state): State<AppState>, request: Request, next: Next) -> Response {
    match extract_token(request.headers()) {
        None => AdapterError::Unauthorized.into_response(),
        Some(token) if state.token_validator.is_user_token(token) => next.run(request).await,
        Some(_) => AdapterError::Forbidden.into_response(),
    }
}
