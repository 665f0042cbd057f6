//! Bearer-token authentication for admin routes.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use fondita_core::session::Session;

/// Token of the authenticated request, available to handlers as an extension.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Extracts the token from `Authorization: Bearer <token>` or a bare token.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        Some(_) => return None,
        None => value,
    };
    (!token.is_empty()).then(|| token.to_string())
}

/// Rejects the request with 401 unless it carries a live session.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = token_from_headers(req.headers()) else {
        return ApiError::unauthorized().into_response();
    };

    let session: Session = match state.auth.authenticate(&token).await {
        Ok(session) => session,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected request");
            return ApiError::unauthorized().into_response();
        }
    };

    req.extensions_mut().insert(session);
    req.extensions_mut().insert(SessionToken(token));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_token_from_headers() {
        assert_eq!(token_from_headers(&headers("Bearer abc")).as_deref(), Some("abc"));
        assert_eq!(token_from_headers(&headers("bearer  abc ")).as_deref(), Some("abc"));
        assert_eq!(token_from_headers(&headers("abc")).as_deref(), Some("abc"));
        assert_eq!(token_from_headers(&headers("Basic abc")), None);
        assert_eq!(token_from_headers(&headers("Bearer ")), None);
        assert_eq!(token_from_headers(&HeaderMap::new()), None);
    }
}
