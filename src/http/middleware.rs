//! Route-level middleware.
//!
//! Each route carries an ordered list of interceptors. Every interceptor
//! wraps the next handler and may short-circuit by not calling it. The
//! first declared interceptor is the outermost one.

use std::future::Future;
use std::sync::Arc;

use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::http::context::RequestContext;

/// Terminal or wrapped request handler.
pub type Handler = Arc<dyn Fn(RequestContext) -> BoxFuture<'static, Response> + Send + Sync>;

/// A request interceptor attached to a route.
pub trait RouteMiddleware: Send + Sync {
    /// Wrap `next`, returning the handler that runs this interceptor.
    fn wrap(&self, next: Handler) -> Handler;
}

/// Build a [`Handler`] from an async closure.
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |ctx: RequestContext| -> BoxFuture<'static, Response> { Box::pin(f(ctx)) })
}

/// Compose `chain` around `inner`, first element outermost.
pub fn compose(chain: &[Arc<dyn RouteMiddleware>], inner: Handler) -> Handler {
    chain
        .iter()
        .rev()
        .fold(inner, |next, middleware| middleware.wrap(next))
}

/// Middleware built from an async closure receiving the context and the
/// next handler.
pub struct FnMiddleware<F> {
    f: Arc<F>,
}

/// Create a middleware from `f(ctx, next)`.
pub fn from_fn<F, Fut>(f: F) -> FnMiddleware<F>
where
    F: Fn(RequestContext, Handler) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    FnMiddleware { f: Arc::new(f) }
}

impl<F, Fut> RouteMiddleware for FnMiddleware<F>
where
    F: Fn(RequestContext, Handler) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn wrap(&self, next: Handler) -> Handler {
        let f = Arc::clone(&self.f);
        Arc::new(move |ctx: RequestContext| -> BoxFuture<'static, Response> {
            Box::pin(f(ctx, Arc::clone(&next)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use std::sync::Mutex;

    fn recording(log: Arc<Mutex<Vec<String>>>, name: &'static str) -> impl RouteMiddleware {
        from_fn(move |ctx, next: Handler| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(format!("{name}:before"));
                let response = next(ctx).await;
                log.lock().unwrap().push(format!("{name}:after"));
                response
            }
        })
    }

    #[tokio::test]
    async fn test_first_declared_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let inner_log = Arc::clone(&log);
        let inner = handler(move |_| {
            let log = Arc::clone(&inner_log);
            async move {
                log.lock().unwrap().push("handler".to_string());
                StatusCode::OK.into_response()
            }
        });

        let chain: Vec<Arc<dyn RouteMiddleware>> = vec![
            Arc::new(recording(Arc::clone(&log), "first")),
            Arc::new(recording(Arc::clone(&log), "second")),
        ];
        let composed = compose(&chain, inner);
        let response = composed(RequestContext::for_path("/")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:before", "second:before", "handler", "second:after", "first:after"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit() {
        let called = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&called);
        let inner = handler(move |_| {
            let flag = Arc::clone(&flag);
            async move {
                *flag.lock().unwrap() = true;
                StatusCode::OK.into_response()
            }
        });

        let deny = from_fn(|_ctx, _next: Handler| async { StatusCode::UNAUTHORIZED.into_response() });
        let chain: Vec<Arc<dyn RouteMiddleware>> = vec![Arc::new(deny)];
        let response = compose(&chain, inner)(RequestContext::for_path("/")).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!*called.lock().unwrap());
    }

    #[tokio::test]
    async fn test_empty_chain_is_identity() {
        let inner = handler(|_| async { StatusCode::ACCEPTED.into_response() });
        let response = compose(&[], inner)(RequestContext::for_path("/")).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
