//! Session extractors.
//!
//! The session is a signed token kept in the `yatube_session` cookie.
//! A `Bearer` token in the Authorization header is accepted too.

use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::{StatusCode, header};
use actix_web::{FromRequest, HttpRequest, HttpResponse, dev::Payload, web};
use serde::Serialize;
use std::future::{Ready, ready};
use uuid::Uuid;

use yatube_core::ports::{AuthError, TokenClaims};

use crate::state::AppState;
use crate::urls;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "yatube_session";

/// Authenticated user identity extractor.
///
/// Handlers taking an `Identity` are login-only: anonymous visitors are
/// redirected to the login page with `next` set to the requested path.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
        }
    }
}

/// Session cookie carrying `token`.
pub fn session_cookie(token: String, max_age_seconds: i64, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(actix_web::cookie::time::Duration::seconds(max_age_seconds))
        .finish()
}

/// Cookie that deletes the session on the client.
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// Resolve the session of a request.
pub fn identify(req: &HttpRequest) -> Result<Identity, AuthError> {
    let Some(state) = req.app_data::<web::Data<AppState>>() else {
        tracing::error!("AppState not found in app data");
        return Err(AuthError::InvalidToken(
            "Server configuration error".to_string(),
        ));
    };

    let token = match req.cookie(SESSION_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() => cookie.value().to_string(),
        _ => bearer_token(req)?,
    };

    let claims = state.tokens.validate_token(&token)?;
    Ok(Identity::from(claims))
}

fn bearer_token(req: &HttpRequest) -> Result<String, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuth)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Invalid authorization header".to_string()))?;

    auth_str
        .strip_prefix("Bearer ")
        .map(ToString::to_string)
        .ok_or_else(|| AuthError::InvalidToken("Expected Bearer token".to_string()))
}

/// A login-only page was requested without a valid session.
#[derive(Debug)]
pub struct AuthenticationError {
    pub error: AuthError,
    /// Path and query the visitor asked for.
    pub next: String,
}

impl std::fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl actix_web::ResponseError for AuthenticationError {
    fn status_code(&self) -> StatusCode {
        StatusCode::FOUND
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::Found();
        response.insert_header((header::LOCATION, urls::login(&self.next)));

        // A stale or forged cookie is dropped so the next request starts clean.
        if matches!(
            self.error,
            AuthError::TokenExpired | AuthError::InvalidToken(_)
        ) {
            response.cookie(removal_cookie());
        }

        response.finish()
    }
}

impl FromRequest for Identity {
    type Error = AuthenticationError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(identify(req).map_err(|error| {
            let next = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| req.path().to_string());
            tracing::debug!(%next, "Anonymous request to a login-only page: {}", error);
            AuthenticationError { error, next }
        }))
    }
}

/// Optional identity extractor - doesn't fail if not authenticated.
pub struct OptionalIdentity(pub Option<Identity>);

impl OptionalIdentity {
    pub fn viewer(&self) -> Viewer {
        Viewer::from(self.0.as_ref())
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|identity| identity.user_id)
    }
}

impl FromRequest for OptionalIdentity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(OptionalIdentity(identify(req).ok())))
    }
}

/// The visitor as templates see it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Viewer {
    pub is_authenticated: bool,
    pub id: Option<Uuid>,
    pub username: Option<String>,
}

impl From<Option<&Identity>> for Viewer {
    fn from(identity: Option<&Identity>) -> Self {
        match identity {
            Some(identity) => Self {
                is_authenticated: true,
                id: Some(identity.user_id),
                username: Some(identity.username.clone()),
            },
            None => Self::default(),
        }
    }
}

impl From<&Identity> for Viewer {
    fn from(identity: &Identity) -> Self {
        Self::from(Some(identity))
    }
}
