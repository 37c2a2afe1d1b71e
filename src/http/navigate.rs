//! Client-side navigation endpoint.
//!
//! `POST /navigate {path, props}` resolves the props for `path` through the
//! route's middleware chain and returns them keyed by path, together with
//! the head metadata the browser needs to update the document.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::context::RequestContext;
use crate::http::error::AppError;
use crate::http::middleware::{compose, handler};
use crate::http::server::AppState;
use crate::routing::route::Props;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NavigateRequest {
    pub path: String,
    #[serde(default)]
    pub props: Props,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NavigateResponse {
    pub path: String,
    /// Resolved props keyed by path.
    pub props: Props,
    pub title: String,
    pub description: String,
}

pub async fn navigate(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<NavigateRequest>,
) -> Response {
    let Some((route, params)) = state.routes.resolve(&body.path) else {
        return AppError::NotFound(body.path).into_response();
    };

    let ctx = RequestContext {
        method,
        uri,
        headers,
        path: body.path,
        client_props: Some(body.props),
    };

    let target = Arc::clone(&route);
    let inner = handler(move |ctx: RequestContext| {
        let route = Arc::clone(&target);
        let params = params.clone();
        async move {
            let resolved = route.resolve_props(&ctx, &params);
            let mut props = Props::new();
            props.insert(ctx.path.clone(), Value::Object(resolved));

            tracing::debug!(path = %ctx.path, route = %route.path(), "Resolved navigation props");
            Json(NavigateResponse {
                path: ctx.path,
                props,
                title: route.head().title.clone(),
                description: route.head().description.clone(),
            })
            .into_response()
        }
    });

    compose(route.middleware_chain(), inner)(ctx).await
}
