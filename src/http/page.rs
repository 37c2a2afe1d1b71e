//! Page assembly.
//!
//! # Data Flow
//! ```text
//! GET <path>
//!     → has extension? → public directory
//!     → RouteTable::resolve (404 on miss)
//!     → route middleware chain (first declared outermost)
//!     → cache hit? → template(cached values) ── x-cache: hit
//!     → props + store → BuildPipeline::build (client ∥ server)
//!     → RenderEngine::render_server
//!     → template(PageData) → PageCache::put ── x-cache: miss
//! ```
//!
//! # Design Decisions
//! - The reload bootstrap is computed per request and never cached
//! - Failed builds and renders are never cached
//! - A route TTL of zero bypasses the cache entirely
//! - A page whose render overlapped a cache clear is served but not stored

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::cache::{expires_in, CacheEntry};
use crate::http::context::RequestContext;
use crate::http::error::AppError;
use crate::http::middleware::{compose, handler, Handler};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::render::{ScriptTag, StyleTag};
use crate::routing::{Route, RouteParams};

/// Cache outcome header.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

pub async fn page(State(state): State<AppState>, request: Request<Body>) -> Response {
    if Path::new(request.uri().path()).extension().is_some() {
        return serve_public(&state, request).await;
    }

    let (parts, _body) = request.into_parts();
    let ctx = RequestContext::from_parts(&parts);

    let Some((route, params)) = state.routes.resolve(&ctx.path) else {
        return AppError::NotFound(ctx.path).into_response();
    };

    let inner = page_handler(state, Arc::clone(&route), params);
    compose(route.middleware_chain(), inner)(ctx).await
}

fn page_handler(state: AppState, route: Arc<Route>, params: RouteParams) -> Handler {
    handler(move |ctx| {
        let state = state.clone();
        let route = Arc::clone(&route);
        let params = params.clone();
        async move {
            let start = Instant::now();
            match assemble(&state, &route, &params, ctx).await {
                Ok((html, outcome)) => {
                    metrics::record_page(outcome, 200, start);
                    html_response(html, outcome)
                }
                Err(e) => {
                    metrics::record_page("miss", e.status().as_u16(), start);
                    e.into_response()
                }
            }
        }
    })
}

/// Render the page for `ctx.path`, returning the document and the cache
/// outcome (`hit`, `miss` or `bypass`).
async fn assemble(
    state: &AppState,
    route: &Route,
    params: &RouteParams,
    ctx: RequestContext,
) -> Result<(String, &'static str), AppError> {
    let reload = state.reload_bootstrap(&ctx);
    let ttl = route.ttl_or(state.default_ttl());
    let cacheable = !ttl.is_zero();

    if cacheable {
        if let Some(entry) = state.cache.get(&ctx.path) {
            tracing::debug!(path = %ctx.path, "Serving cached page");
            let html = state.template.render(&entry.to_page_data(reload))?;
            return Ok((html, "hit"));
        }
    }

    let generation = state.cache.generation();
    let props = route.resolve_props(&ctx, params);
    let store = state.resolve_store(&ctx);
    let bundles = state.pipeline.build(&ctx.path, &props, &store).await?;
    let markup = state.renderer.render_server(bundles.server.js, &ctx.path).await?;

    let head = route.head();
    let entry = CacheEntry {
        key: ctx.path.clone(),
        title: head.title.clone(),
        description: head.description.clone(),
        favicon: state.config.frontend.favicon_path.clone(),
        meta_tags: head.meta_tags.clone(),
        css_links: head.css_links.iter().map(StyleTag::from).collect(),
        js_links: head.js_links.iter().map(ScriptTag::from).collect(),
        head_extra: state.config.frontend.head_extra.clone(),
        body: markup,
        css: join_css(&bundles.server.css, &state.stylesheet.current()),
        js: bundles.client.js,
        expires_at: expires_in(ttl),
    };

    let html = state.template.render(&entry.to_page_data(reload))?;
    if !cacheable {
        return Ok((html, "bypass"));
    }

    if state.cache.put_if_current(entry, generation) {
        metrics::record_cache_size(state.cache.len());
        tracing::debug!(path = %ctx.path, ttl_secs = ttl.as_secs(), "Cached page");
    } else {
        tracing::debug!(path = %ctx.path, "Sources changed during render, page not cached");
    }
    Ok((html, "miss"))
}

fn join_css(bundle: &str, utility: &str) -> String {
    match (bundle.is_empty(), utility.is_empty()) {
        (_, true) => bundle.to_string(),
        (true, false) => utility.to_string(),
        (false, false) => format!("{bundle}\n{utility}"),
    }
}

fn html_response(html: String, outcome: &'static str) -> Response {
    let cache = if outcome == "hit" { "hit" } else { "miss" };
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8")),
            (X_CACHE, HeaderValue::from_static(cache)),
        ],
        html,
    )
        .into_response()
}

async fn serve_public(state: &AppState, request: Request<Body>) -> Response {
    let start = Instant::now();
    let response = match ServeDir::new(&state.config.frontend.public_path).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    };
    metrics::record_page("static", response.status().as_u16(), start);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_css() {
        assert_eq!(join_css("a{}", ""), "a{}");
        assert_eq!(join_css("", "b{}"), "b{}");
        assert_eq!(join_css("a{}", "b{}"), "a{}\nb{}");
    }

    #[test]
    fn test_html_response_headers() {
        let response = html_response("<p></p>".into(), "bypass");
        assert_eq!(response.headers()[X_CACHE], "miss");
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
    }
}
