//! Session cookie contract
//!
//! The token travels in a single cookie scoped to `/`, `HttpOnly`,
//! `SameSite=Lax`, expiring together with the server-side session. Logout
//! answers with a removal cookie of the same name and path.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use time::OffsetDateTime;

fn base_cookie(name: &str, value: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), value.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Cookie issuing a session
pub fn session_cookie(
    name: &str,
    token: &str,
    expires_at: DateTime<Utc>,
    secure: bool,
) -> Cookie<'static> {
    let max_age = (expires_at - Utc::now()).num_seconds().max(0);
    let expires = OffsetDateTime::from_unix_timestamp(expires_at.timestamp())
        .unwrap_or(OffsetDateTime::UNIX_EPOCH);

    let mut cookie = base_cookie(name, token, secure);
    cookie.set_expires(expires);
    cookie.set_max_age(time::Duration::seconds(max_age));
    cookie
}

/// Cookie instructing the client to drop the session
pub fn expired_cookie(name: &str, secure: bool) -> Cookie<'static> {
    let mut cookie = base_cookie(name, "", secure);
    cookie.make_removal();
    cookie
}

/// Non-empty value of cookie `name`
pub fn read_cookie(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|value| !value.is_empty())
}
