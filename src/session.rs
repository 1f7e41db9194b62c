//! `demo-session` cookie handling.
//!
//! The token is only a key for the session's document; it carries no
//! authority and is never validated against a server-side table.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, header, request::Parts},
    response::Response,
};
use cookie::{Cookie, SameSite, time::Duration};
use rand::RngCore;

pub const SESSION_COOKIE: &str = "demo-session";
/// One year, in seconds.
pub const SESSION_MAX_AGE: u64 = 31_536_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    token: String,
    issued: bool,
}

impl SessionToken {
    /// Fresh random 32-byte token, hex encoded.
    pub fn generate() -> Self {
        Self {
            token: random_token(),
            issued: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// True when the request carried no usable cookie and this token is new.
    pub fn is_new(&self) -> bool {
        self.issued
    }

    /// Not HttpOnly: the legacy frontend reads the token from script.
    pub fn cookie(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, self.token.clone()))
            .path("/")
            .max_age(Duration::seconds(SESSION_MAX_AGE as i64))
            .same_site(SameSite::Lax)
            .build()
    }

    /// Sets or refreshes the session cookie on `response`.
    pub fn attach(&self, mut response: Response) -> Response {
        match HeaderValue::from_str(&self.cookie().to_string()) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(err) => tracing::warn!(error = %err, "session cookie not representable"),
        }
        response
    }

    fn from_cookie_header(value: &str) -> Option<Self> {
        Cookie::split_parse(value)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == SESSION_COOKIE)
            .map(|cookie| cookie.value_trimmed().to_string())
            .filter(|token| is_valid_token(token))
            .map(|token| Self {
                token,
                issued: false,
            })
    }
}

/// Tokens double as file names, so only a conservative alphabet is accepted.
pub fn is_valid_token(token: &str) -> bool {
    (1..=128).contains(&token.len())
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

pub fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let existing = parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(SessionToken::from_cookie_header);

        Ok(existing.unwrap_or_else(SessionToken::generate))
    }
}
