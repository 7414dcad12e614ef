use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, warn};

use crate::application::repos::PostListScope;
use crate::application::sessions::{SessionAuthError, SessionPrincipal};
use crate::domain::types::PostStatus;

use super::error::{ApiError, codes};
use super::state::ApiState;

/// Who is making the request, as far as the session token says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    /// A token was sent but did not authenticate.
    Rejected(SessionAuthError),
    Author(SessionPrincipal),
}

impl Viewer {
    pub fn scope(&self, status: Option<PostStatus>) -> PostListScope {
        match self {
            Viewer::Author(_) => PostListScope::Admin { status },
            Viewer::Anonymous | Viewer::Rejected(_) => PostListScope::Public,
        }
    }

    pub fn author(&self) -> Option<&SessionPrincipal> {
        match self {
            Viewer::Author(principal) => Some(principal),
            _ => None,
        }
    }
}

/// Resolve the session token, if any, into a [`Viewer`] on both the request
/// and the response so the response logger can see it.
pub async fn resolve_viewer(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let viewer = match session_token(request.headers(), &state.cookie_name) {
        None => Viewer::Anonymous,
        Some(token) => match state.sessions.authenticate(&token).await {
            Ok(principal) => Viewer::Author(principal),
            Err(err @ SessionAuthError::Unavailable(_)) => {
                warn!(
                    target = "postdesk::http::api::auth",
                    error = %err,
                    "session lookup failed"
                );
                Viewer::Rejected(err)
            }
            Err(err) => {
                debug!(
                    target = "postdesk::http::api::auth",
                    reason = %err,
                    "session token rejected"
                );
                Viewer::Rejected(err)
            }
        },
    };

    request.extensions_mut().insert(viewer.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(viewer);
    response
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    /// Unreadable tokens read as anonymous; a failed session lookup does not.
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Viewer>() {
            Some(Viewer::Rejected(err @ SessionAuthError::Unavailable(_))) => {
                Err(lookup_failed(err))
            }
            Some(viewer) => Ok(viewer.clone()),
            None => Ok(Viewer::Anonymous),
        }
    }
}

/// Extractor for handlers that need an authenticated author.
#[derive(Debug, Clone)]
pub struct SessionAuthor(pub SessionPrincipal);

impl<S> FromRequestParts<S> for SessionAuthor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Viewer>() {
            Some(Viewer::Author(principal)) => Ok(SessionAuthor(principal.clone())),
            Some(Viewer::Rejected(SessionAuthError::Expired)) => Err(ApiError::new(
                StatusCode::UNAUTHORIZED,
                codes::SESSION_EXPIRED,
                "Session expired",
            )),
            Some(Viewer::Rejected(SessionAuthError::Revoked)) => Err(ApiError::new(
                StatusCode::UNAUTHORIZED,
                codes::SESSION_REVOKED,
                "Session revoked",
            )),
            Some(Viewer::Rejected(err @ SessionAuthError::Unavailable(_))) => {
                Err(lookup_failed(err))
            }
            Some(Viewer::Rejected(err)) => Err(ApiError::unauthorized().with_detail(err.to_string())),
            Some(Viewer::Anonymous) | None => Err(ApiError::unauthorized()),
        }
    }
}

fn lookup_failed(err: &SessionAuthError) -> ApiError {
    ApiError::internal(codes::INTERNAL, "Internal server error", err)
}

/// Bearer token first, then the session cookie.
fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    bearer_token(headers).or_else(|| cookie_value(headers, cookie_name))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
