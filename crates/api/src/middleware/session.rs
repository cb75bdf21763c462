//! Anonymous session identity.
//!
//! Clients are identified by a UUID carried in the `pola_session_id` cookie,
//! or in the `X-Session-ID` header for clients that cannot hold cookies.
//! Anything that is not a well-formed UUID is ignored and a fresh id is
//! minted.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, HeaderName, header, request::Parts};
use cookie::time::Duration;
use cookie::{Cookie, SameSite};

use pola_core::SessionId;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "pola_session_id";

/// Fallback header for the session id.
pub const SESSION_HEADER: &str = "x-session-id";

/// Session cookie lifetime in days.
const SESSION_COOKIE_DAYS: i64 = 30;

/// The session a request belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    /// `true` when no valid id was supplied and this one was just minted.
    pub is_new: bool,
}

impl Session {
    /// Resolve the session from request headers: cookie first, then the
    /// `X-Session-ID` header, else a new id.
    #[must_use]
    pub fn resolve(headers: &HeaderMap) -> Self {
        let supplied = cookie_session(headers).or_else(|| header_session(headers));
        supplied.map_or_else(
            || Self {
                id: SessionId::generate(),
                is_new: true,
            },
            |id| Self { id, is_new: false },
        )
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = Self::resolve(&parts.headers);
        tracing::Span::current().record("session_id", session.id.as_str());
        Ok(session)
    }
}

fn cookie_session(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == SESSION_COOKIE_NAME)
        .and_then(|c| SessionId::parse(c.value()).ok())
}

fn header_session(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| SessionId::parse(value.trim()).ok())
}

/// `Set-Cookie` header binding the client to `id`.
#[must_use]
pub fn set_session_cookie(id: &SessionId, secure: bool) -> [(HeaderName, String); 1] {
    let cookie = Cookie::build((SESSION_COOKIE_NAME, id.as_str().to_owned()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::days(SESSION_COOKIE_DAYS))
        .build();
    [(header::SET_COOKIE, cookie.to_string())]
}

/// `Set-Cookie` header that expires the session cookie.
#[must_use]
pub fn clear_session_cookie(secure: bool) -> [(HeaderName, String); 1] {
    let cookie = Cookie::build((SESSION_COOKIE_NAME, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::ZERO)
        .build();
    [(header::SET_COOKIE, cookie.to_string())]
}
