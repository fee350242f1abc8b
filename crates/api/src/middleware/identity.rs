//! Identity middleware for diary routes.
//!
//! Sign-in lives in the external identity service. This layer only checks
//! the session token it issued and records who is calling.
//!
//! Browsers attach the session cookie to cross-site form posts, so a
//! state-changing request authenticated by cookie must also come from this
//! site. Bearer tokens are never sent implicitly and skip that check.

use std::convert::Infallible;

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{
        HeaderMap, StatusCode,
        header::{AUTHORIZATION, AsHeaderName, HOST, ORIGIN},
        request::Parts,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use tracing::warn;
use url::Url;

use crate::AppState;
use diary_shared::{SessionError, UserId};

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Where a session token was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenSource {
    Header,
    Cookie,
}

/// Finds the session token in the Authorization header or, failing that,
/// in the session cookie.
fn session_token(request: &Request, cookie_name: &str) -> Option<(String, TokenSource)> {
    let from_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
        .map(|token| (token.to_string(), TokenSource::Header));

    from_header.or_else(|| {
        CookieJar::from_headers(request.headers())
            .get(cookie_name)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
            .map(|token| (token, TokenSource::Cookie))
    })
}

/// Whether the request was issued by a page of this site.
///
/// `Sec-Fetch-Site` wins when the browser sends it. Otherwise the `Origin`
/// authority must equal the `Host` header. A request carrying neither is
/// treated as cross-site.
fn is_same_origin(headers: &HeaderMap) -> bool {
    if let Some(site) = header_str(headers, "sec-fetch-site") {
        return matches!(site, "same-origin" | "none");
    }

    let (Some(origin), Some(host)) = (header_str(headers, ORIGIN), header_str(headers, HOST))
    else {
        return false;
    };
    let Ok(origin) = Url::parse(origin) else {
        return false;
    };
    let Some(origin_host) = origin.host_str() else {
        return false;
    };

    let authority = match origin.port() {
        Some(port) => format!("{origin_host}:{port}"),
        None => origin_host.to_string(),
    };
    authority.eq_ignore_ascii_case(host.trim())
}

fn header_str(headers: &HeaderMap, name: impl AsHeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn forbidden(error: &str, message: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": error, "message": message })),
    )
        .into_response()
}

fn unauthorized(error: &str, message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": error, "message": message })),
    )
        .into_response()
}

/// Identity middleware that validates session tokens.
///
/// This middleware:
/// 1. Reads the token from `Authorization: Bearer` or the session cookie
/// 2. Rejects cookie-authenticated writes that come from another site
/// 3. Verifies the token with the shared secret
/// 4. Stores the caller's `UserId` in request extensions
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some((token, source)) = session_token(&request, &state.session_cookie) else {
        return unauthorized(
            "missing_token",
            "A session cookie or Bearer token is required",
        );
    };

    if source == TokenSource::Cookie
        && !request.method().is_safe()
        && !is_same_origin(request.headers())
    {
        warn!(
            method = %request.method(),
            path = %request.uri().path(),
            "Rejected cross-site request carrying the session cookie"
        );
        return forbidden(
            "csrf_rejected",
            "Cookie-authenticated writes must come from this site",
        );
    }

    match state.sessions.verify(&token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims.user_id());
            next.run(request).await
        }
        Err(SessionError::Expired) => unauthorized("token_expired", "Session has expired"),
        Err(_) => unauthorized("invalid_token", "Invalid or malformed session token"),
    }
}

/// Extractor for the calling user, if any.
///
/// Handlers pass the inner value straight to the diary service, which
/// treats `None` as a caller owning nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentUser(pub Option<UserId>);

impl CurrentUser {
    /// Returns the user ID, if identified.
    #[must_use]
    pub fn id(&self) -> Option<&UserId> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<UserId>().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Request, header::COOKIE},
        middleware::from_fn_with_state,
        routing::get,
    };
    use chrono::Duration;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::test_support::{test_state, token_for};

    async fn whoami(user: CurrentUser) -> String {
        user.id().map(ToString::to_string).unwrap_or_default()
    }

    fn app() -> Router {
        let state = test_state();
        Router::new()
            .route("/whoami", get(whoami).post(whoami))
            .layer(from_fn_with_state(state.clone(), identity_middleware))
            .with_state(state)
    }

    async fn call(request: Request<Body>) -> (StatusCode, String) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[tokio::test]
    async fn test_missing_token() {
        let (status, body) = call(Request::get("/whoami").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("missing_token"));
    }

    #[tokio::test]
    async fn test_bearer_token() {
        let token = token_for("user-1", Duration::hours(1));
        let request = Request::get("/whoami")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        assert_eq!(call(request).await, (StatusCode::OK, "user-1".to_string()));
    }

    #[tokio::test]
    async fn test_session_cookie() {
        let token = token_for("user-2", Duration::hours(1));
        let request = Request::get("/whoami")
            .header(COOKIE, format!("theme=dark; diary_session={token}"))
            .body(Body::empty())
            .unwrap();

        assert_eq!(call(request).await, (StatusCode::OK, "user-2".to_string()));
    }

    #[tokio::test]
    async fn test_expired_token() {
        let token = token_for("user-1", Duration::hours(-2));
        let request = Request::get("/whoami")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        let (status, body) = call(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("token_expired"));
    }

    #[tokio::test]
    async fn test_forged_token() {
        let request = Request::get("/whoami")
            .header(AUTHORIZATION, "Bearer not.a.token")
            .body(Body::empty())
            .unwrap();

        let (status, body) = call(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("invalid_token"));
    }

    fn cookie_post(headers: &[(&str, &str)]) -> Request<Body> {
        let token = token_for("user-3", Duration::hours(1));
        let mut builder = Request::post("/whoami")
            .header(COOKIE, format!("diary_session={token}"))
            .header(HOST, "diary.test");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[rstest::rstest]
    #[case::no_origin(&[])]
    #[case::foreign_origin(&[("origin", "https://evil.test")])]
    #[case::other_port(&[("origin", "https://diary.test:8443")])]
    #[case::opaque_origin(&[("origin", "null")])]
    #[case::cross_site_fetch(&[("sec-fetch-site", "cross-site"), ("origin", "https://diary.test")])]
    #[case::same_site_fetch(&[("sec-fetch-site", "same-site")])]
    #[tokio::test]
    async fn test_cross_site_cookie_post_is_rejected(#[case] headers: &[(&str, &str)]) {
        let (status, body) = call(cookie_post(headers)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains("csrf_rejected"));
    }

    #[rstest::rstest]
    #[case::matching_origin(&[("origin", "https://diary.test")])]
    #[case::matching_origin_any_case(&[("origin", "https://Diary.Test")])]
    #[case::same_origin_fetch(&[("sec-fetch-site", "same-origin")])]
    #[case::typed_navigation(&[("sec-fetch-site", "none")])]
    #[tokio::test]
    async fn test_same_site_cookie_post_is_accepted(#[case] headers: &[(&str, &str)]) {
        assert_eq!(
            call(cookie_post(headers)).await,
            (StatusCode::OK, "user-3".to_string())
        );
    }

    #[tokio::test]
    async fn test_bearer_post_skips_origin_check() {
        let token = token_for("user-1", Duration::hours(1));
        let request = Request::post("/whoami")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header("origin", "https://evil.test")
            .body(Body::empty())
            .unwrap();

        assert_eq!(call(request).await, (StatusCode::OK, "user-1".to_string()));
    }
}
