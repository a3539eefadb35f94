//! Per-request state threaded through the migration pipeline. Owned
//! exclusively by the serving worker for the lifetime of one request.

use std::collections::HashMap;

use axum::http::HeaderMap;

use crate::document::Document;
use crate::endpoint::RouteKey;

/// The request side of one in-flight migration: the parsed body plus enough
/// request context for path-pattern and schema-tag matching.
pub struct RequestInfo {
    pub body: Document,
    pub headers: HeaderMap,
    pub cookies: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub route_key: RouteKey,
    /// Caches whether an `OperationTarget` has already been matched against
    /// this request, so a multi-edge chain does not re-match per edge.
    pub(crate) match_cache: HashMap<String, bool>,
}

impl RequestInfo {
    pub fn new(body: Document, headers: HeaderMap, route_key: RouteKey) -> Self {
        Self {
            body,
            headers,
            cookies: HashMap::new(),
            query: HashMap::new(),
            route_key,
            match_cache: HashMap::new(),
        }
    }
}

/// The response side of one in-flight migration: the parsed captured body,
/// status code, and headers, observed after the head handler ran.
pub struct ResponseInfo {
    pub body: Document,
    pub status: u16,
    pub headers: HeaderMap,
    pub route_key: RouteKey,
    pub(crate) match_cache: HashMap<String, bool>,
}

impl ResponseInfo {
    pub fn new(body: Document, status: u16, headers: HeaderMap, route_key: RouteKey) -> Self {
        Self {
            body,
            status,
            headers,
            route_key,
            match_cache: HashMap::new(),
        }
    }
}
