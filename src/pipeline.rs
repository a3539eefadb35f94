//! The per-request middleware + handler wrapper: body buffering, forward
//! migration, response capture, backward migration, per §4.H.
//!
//! Structured as a [`tower::Layer`]/[`tower::Service`] pair wrapping the inner
//! router, in the shape of the teacher crate's `ApiVersionLayer`/`ApiVersion`:
//! a single `Box::pin(async move { .. })` future per request, no spawned
//! tasks, `poll_ready` delegated straight to the inner service.

use std::collections::HashMap;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::{to_bytes, Body, Bytes};
use axum::extract::{MatchedPath, Request};
use axum::http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::RequestExt;
use futures::future::BoxFuture;
use serde::Serialize;
use tower::{Layer, Service};
use tracing::{debug, error};

use crate::bundle::VersionBundle;
use crate::chain::MigrationChain;
use crate::change::VersionChange;
use crate::document::Document;
use crate::endpoint::{route_key, EndpointMeta, RouteKey};
use crate::error::Error;
use crate::manager::VersionManager;
use crate::request::{RequestInfo, ResponseInfo};
use crate::version::Version;

/// A body larger than this is rejected during buffering rather than read
/// unbounded into memory; chosen generously since migrated bodies are
/// expected to be small JSON payloads, not file uploads.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// The resolved version and resolution metadata for the current request,
/// available to downstream handlers and to `tracing` via a request
/// extension, per §4.H step 2.
#[derive(Debug, Clone)]
pub struct VersionContext {
    pub version: Version,
    pub default_used: bool,
    pub parameter: String,
}

pub(crate) struct Shared {
    pub bundle: VersionBundle,
    pub chain: MigrationChain,
    pub manager: VersionManager,
    pub endpoints: HashMap<RouteKey, EndpointMeta>,
}

impl Shared {
    fn head(&self) -> Version {
        self.bundle
            .head_version()
            .cloned()
            .unwrap_or_else(|| self.bundle.versions().last().expect("bundle is non-empty").clone())
    }

    fn endpoint_meta(&self, key: &RouteKey) -> EndpointMeta {
        self.endpoints.get(key).cloned().unwrap_or_default()
    }
}

/// `tower::Layer` assembled by [`crate::VersionMigrationBuilder::build`].
#[derive(Clone)]
pub struct VersionMigrationLayer {
    pub(crate) shared: Arc<Shared>,
}

impl<S> Layer<S> for VersionMigrationLayer {
    type Service = VersionMigration<S>;

    fn layer(&self, inner: S) -> Self::Service {
        VersionMigration {
            inner,
            shared: Arc::clone(&self.shared),
        }
    }
}

/// See [`VersionMigrationLayer`].
#[derive(Clone)]
pub struct VersionMigration<S> {
    inner: S,
    shared: Arc<Shared>,
}

impl<S> Service<Request> for VersionMigration<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let mut inner = self.inner.clone();
        let shared = Arc::clone(&self.shared);

        Box::pin(async move {
            let method = request.method().as_str().to_string();
            let path = request.uri().path().to_string();

            let matched_path = request
                .extract_parts::<MatchedPath>()
                .await
                .ok()
                .map(|p| p.as_str().to_string());
            let key = route_key(&method, matched_path.as_deref().unwrap_or(&path));

            let candidate = shared.manager.extract_token(request.headers(), &path);
            let resolved = match shared.manager.resolve(candidate.as_deref(), &shared.bundle) {
                Ok(resolved) => resolved,
                Err(Error::UnknownVersion { candidate, available }) => {
                    debug!(candidate, "unknown API version");
                    return Ok(error_response(
                        StatusCode::BAD_REQUEST,
                        "unknown API version",
                        Some(&available),
                        Some("see available_versions for declared versions"),
                    ));
                }
                Err(other) => {
                    error!(error = %other, "unexpected error resolving API version");
                    return Ok(error_response(StatusCode::INTERNAL_SERVER_ERROR, "version resolution failed", None, None));
                }
            };
            debug!(version = %resolved.version, default_used = resolved.default_used, "resolved API version");

            request.extensions_mut().insert(VersionContext {
                version: resolved.version.clone(),
                default_used: resolved.default_used,
                parameter: shared.manager.header_name().to_string(),
            });

            let meta = shared.endpoint_meta(&key);
            let head = shared.head();

            let (mut parts, body) = request.into_parts();
            let original_bytes = match to_bytes(body, MAX_BODY_BYTES).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!(error = %e, "failed to buffer request body");
                    return Ok(error_response(StatusCode::BAD_REQUEST, "failed to read request body", None, None));
                }
            };

            let forward_bytes = if original_bytes.is_empty() {
                original_bytes.clone()
            } else {
                match Document::parse(&original_bytes) {
                    Ok(doc) => {
                        let mut req_info = RequestInfo::new(doc, parts.headers.clone(), key.clone());
                        match migrate_request(&shared, &resolved.version, &head, &meta, &mut req_info) {
                            Ok(()) => Bytes::from(req_info.body.raw()),
                            Err(e) => {
                                error!(error = %e, "request migration failed");
                                return Ok(error_response(
                                    StatusCode::INTERNAL_SERVER_ERROR,
                                    "Request migration failed",
                                    None,
                                    Some(&e.to_string()),
                                ));
                            }
                        }
                    }
                    // Not JSON: pass through unchanged, let the handler surface its own error.
                    Err(_) => original_bytes.clone(),
                }
            };

            parts.headers.remove(axum::http::header::CONTENT_LENGTH);
            let request = Request::from_parts(parts, Body::from(forward_bytes));

            let response = inner.call(request).await?;
            let (resp_parts, resp_body) = response.into_parts();
            let status = resp_parts.status;

            let resp_bytes = match to_bytes(resp_body, MAX_BODY_BYTES).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!(error = %e, "failed to buffer response body");
                    Bytes::new()
                }
            };

            let final_bytes = if resp_bytes.is_empty() {
                resp_bytes.clone()
            } else {
                match Document::parse(&resp_bytes) {
                    Ok(doc) => {
                        let mut resp_info =
                            ResponseInfo::new(doc, status.as_u16(), resp_parts.headers.clone(), key.clone());
                        match migrate_response(&shared, &head, &resolved.version, &meta, &mut resp_info) {
                            Ok(()) => Bytes::from(resp_info.body.raw()),
                            Err(e) => {
                                error!(error = %e, "response migration failed");
                                return Ok(error_response(
                                    StatusCode::INTERNAL_SERVER_ERROR,
                                    "Response migration failed",
                                    None,
                                    Some(&e.to_string()),
                                ));
                            }
                        }
                    }
                    Err(_) => resp_bytes.clone(),
                }
            };

            let mut builder = Response::builder().status(status);
            for (name, value) in resp_parts.headers.iter() {
                if name == axum::http::header::CONTENT_LENGTH {
                    continue;
                }
                builder = builder.header(name, value);
            }
            if let Ok(value) = HeaderValue::from_str(resolved.version.raw()) {
                builder = builder.header(shared.manager.header_name(), value);
            }
            if !final_bytes.is_empty() {
                builder = builder.header(CONTENT_TYPE, "application/json");
            }

            let response = builder
                .body(Body::from(final_bytes))
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response());
            Ok(response)
        })
    }
}

fn migrate_request(
    shared: &Shared,
    client_version: &Version,
    head: &Version,
    meta: &EndpointMeta,
    request: &mut RequestInfo,
) -> Result<(), Error> {
    let path: Vec<&VersionChange> = shared.chain.path(client_version, head)?;
    for edge in path {
        edge.apply_request(request, meta)?;
    }
    Ok(())
}

fn migrate_response(
    shared: &Shared,
    head: &Version,
    client_version: &Version,
    meta: &EndpointMeta,
    response: &mut ResponseInfo,
) -> Result<(), Error> {
    let path: Vec<&VersionChange> = shared.chain.path(head, client_version)?;
    for edge in path {
        edge.apply_response(response, meta)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    available_versions: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'a str>,
}

fn error_response(
    status: StatusCode,
    message: &str,
    available_versions: Option<&[String]>,
    hint: Option<&str>,
) -> Response {
    let body = ErrorBody {
        error: message,
        available_versions,
        hint,
    };
    let bytes = serde_json::to_vec(&body).unwrap_or_default();
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    (status, headers, bytes).into_response()
}
