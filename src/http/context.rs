//! Request context handed to props resolvers and route middleware.

use axum::http::{request::Parts, HeaderMap, Method, Uri};

use crate::routing::route::Props;

/// Owned snapshot of the parts of a request that route code may inspect.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Path being rendered. For `/navigate` this is the body's `path`.
    pub path: String,
    /// Props sent by the browser on client-side navigation.
    pub client_props: Option<Props>,
}

impl RequestContext {
    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            path: parts.uri.path().to_string(),
            client_props: None,
        }
    }

    /// Context for a bare GET of `path`.
    pub fn for_path(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            method: Method::GET,
            uri: path.parse().unwrap_or_default(),
            headers: HeaderMap::new(),
            path,
            client_props: None,
        }
    }

    /// Host header without the port. IPv6 literals keep their brackets.
    pub fn hostname(&self) -> Option<&str> {
        self.headers
            .get("host")
            .and_then(|h| h.to_str().ok())
            .or_else(|| self.uri.host())
            .map(strip_port)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Drop a trailing `:port`. Unbracketed IPv6 addresses are left whole.
fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port))
            if !port.is_empty()
                && port.bytes().all(|b| b.is_ascii_digit())
                && (name.ends_with(']') || !name.contains(':')) =>
        {
            name
        }
        _ => host,
    }
}
