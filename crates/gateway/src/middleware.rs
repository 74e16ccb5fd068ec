//! Axum middleware that puts every request behind a canonical prefix.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use prefixgate_core::TextDirection;
use prefixgate_governance::{track_request, track_resolution, track_trailing_slash_redirect};

use crate::resolver::{PathPrefixResolver, PrefixRequest, RedirectKind, Resolution, Vary};

const PERMANENT_CACHE_CONTROL: &str = "max-age=31536000";

/// State shared by [`prefix_middleware`].
#[derive(Clone)]
pub struct PrefixState {
    pub resolver: Arc<PathPrefixResolver>,
    pub enforce_trailing_slash: bool,
}

impl PrefixState {
    pub fn new(resolver: Arc<PathPrefixResolver>) -> Self {
        Self {
            resolver,
            enforce_trailing_slash: true,
        }
    }

    pub fn with_trailing_slash(mut self, enforce: bool) -> Self {
        self.enforce_trailing_slash = enforce;
        self
    }
}

/// Resolved prefix, available to handlers as a request extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestPrefix {
    pub lang: String,
    pub client_app: String,
    pub direction: TextDirection,
    /// Forwarded so that server-side rendering sees the same UA.
    pub user_agent: Option<String>,
}

/// Redirect, hand off, or annotate the request with its [`RequestPrefix`].
pub async fn prefix_middleware(State(state): State<PrefixState>, mut req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();

    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let accept_language = header_string(&req, header::ACCEPT_LANGUAGE);
    let user_agent = header_string(&req, header::USER_AGENT);

    let request = PrefixRequest {
        path: &path,
        accept_language: accept_language.as_deref(),
        user_agent: user_agent.as_deref(),
    };
    let resolution = state.resolver.resolve(&request);
    track_resolution(resolution.outcome());

    let response = match resolution {
        Resolution::Redirect { kind, location, vary } => redirect_response(kind, &location, vary),
        Resolution::NotFound => not_found_response(),
        Resolution::Passthrough {
            lang,
            client_app,
            vary,
        } => {
            let slash_location = state
                .enforce_trailing_slash
                .then(|| state.resolver.trailing_slash_redirect(&path))
                .flatten();

            match slash_location {
                Some(location) => {
                    tracing::debug!(path = %path, location = %location, "Adding trailing slash");
                    track_trailing_slash_redirect();
                    redirect_response(RedirectKind::Permanent, &location, vary)
                }
                None => {
                    let direction = state.resolver.locale().direction(&lang);
                    req.extensions_mut().insert(RequestPrefix {
                        lang,
                        client_app,
                        direction,
                        user_agent,
                    });
                    let mut response = next.run(req).await;
                    append_vary(&mut response, vary);
                    response
                }
            }
        }
    };

    track_request(&method, response.status().as_u16(), start.elapsed().as_secs_f64());
    response
}

fn header_string(req: &Request, name: header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn redirect_response(kind: RedirectKind, location: &str, vary: Vary) -> Response {
    let Ok(location_value) = HeaderValue::from_str(location) else {
        tracing::warn!(location = %location, "Redirect location is not a valid header value");
        return (StatusCode::BAD_REQUEST, "Bad request path").into_response();
    };

    let status = match kind {
        RedirectKind::Permanent => StatusCode::MOVED_PERMANENTLY,
        RedirectKind::Temporary => StatusCode::FOUND,
    };

    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(header::LOCATION, location_value);
    if kind == RedirectKind::Permanent {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(PERMANENT_CACHE_CONTROL));
    }
    append_vary(&mut response, vary);
    response
}

fn not_found_response() -> Response {
    (
        StatusCode::NOT_FOUND,
        "Not found: this path is served by another application",
    )
        .into_response()
}

fn append_vary(response: &mut Response, vary: Vary) {
    for name in vary.header_names() {
        response.headers_mut().append(header::VARY, HeaderValue::from_static(name));
    }
}
