//! Request authentication.
//!
//! Every request runs through [`authenticate`] once, before the handler. The
//! result is a [`RequestIdentity`] stored in the request extensions, which
//! handlers pull out as an extractor.

use crate::domain::error::ServiceError;
use crate::domain::model::{Principal, User};
use crate::transport::http::error::ApiError;
use crate::transport::http::types::AppState;
use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// How [`authenticate`] treats a request without a credential.
///
/// Every mounted route uses `Required` through [`require_auth`]; `Optional` is
/// for callers that resolve identity themselves via [`authenticate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    /// A request without a credential is rejected.
    Required,
    /// A request without a credential proceeds as [`Principal::Anonymous`].
    Optional,
}

/// The principal bound to the current request plus the raw credential it was
/// resolved from.
#[derive(Debug, Clone)]
pub struct RequestIdentity {
    pub principal: Principal,
    pub token: Option<String>,
}

impl RequestIdentity {
    pub fn anonymous() -> Self {
        Self {
            principal: Principal::Anonymous,
            token: None,
        }
    }

    /// The authenticated user, or `InvalidAuthToken` for an anonymous request.
    pub fn require_user(&self) -> Result<&User, ApiError> {
        self.principal.user().ok_or(ApiError::InvalidAuthToken)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestIdentity>()
            .cloned()
            .unwrap_or_else(RequestIdentity::anonymous))
    }
}

/// `Authorization: Bearer <token>` (the `Token` scheme is accepted too).
///
/// `Ok(None)` when the header is absent; any malformed header is an invalid
/// token.
fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| ApiError::InvalidAuthToken)?;
    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(ApiError::InvalidAuthToken)?;
    let token = token.trim();
    let known_scheme =
        scheme.eq_ignore_ascii_case("bearer") || scheme.eq_ignore_ascii_case("token");
    if !known_scheme || token.is_empty() {
        return Err(ApiError::InvalidAuthToken);
    }
    Ok(Some(token))
}

/// Resolves the request's principal.
///
/// A missing credential is rejected under [`AuthPolicy::Required`] and
/// anonymous otherwise. A credential that fails verification for any reason is
/// `InvalidAuthToken`. A verified credential whose user cannot be loaded is an
/// internal error, not an auth failure.
pub async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    policy: AuthPolicy,
) -> Result<RequestIdentity, ApiError> {
    let Some(token) = bearer_token(headers)? else {
        return match policy {
            AuthPolicy::Required => Err(ApiError::InvalidAuthToken),
            AuthPolicy::Optional => Ok(RequestIdentity::anonymous()),
        };
    };

    let claims = state.tokens.verify(token).map_err(|err| {
        tracing::debug!(error = %err, "rejected bearer token");
        ApiError::InvalidAuthToken
    })?;

    let user = state.users.by_email(&claims.email).await.map_err(|err| {
        ServiceError::internal(anyhow::anyhow!(
            "token for user {} verified but the user could not be loaded: {err}",
            claims.id
        ))
    })?;

    Ok(RequestIdentity {
        principal: Principal::Authenticated(user),
        token: Some(token.to_owned()),
    })
}

/// Route layer for routes that need a principal.
pub async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    run_with_identity(state, request, next, AuthPolicy::Required).await
}

async fn run_with_identity(
    state: AppState,
    mut request: Request,
    next: Next,
    policy: AuthPolicy,
) -> Response {
    let mut response = match authenticate(&state, request.headers(), policy).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    };
    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Authorization"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(&HeaderMap::new()).unwrap(), None);
        assert_eq!(bearer_token(&headers("Bearer abc")).unwrap(), Some("abc"));
        assert_eq!(bearer_token(&headers("Token abc")).unwrap(), Some("abc"));
        assert!(bearer_token(&headers("abc")).is_err());
        assert!(bearer_token(&headers("Basic abc")).is_err());
        assert!(bearer_token(&headers("Bearer ")).is_err());
    }

    #[test]
    fn anonymous_identity_has_no_user() {
        let identity = RequestIdentity::anonymous();
        assert!(identity.principal.is_anonymous());
        assert!(matches!(
            identity.require_user(),
            Err(ApiError::InvalidAuthToken)
        ));
    }
}
