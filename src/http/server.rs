//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Collect routes, resolvers and engine components (builder)
//! - Create the Axum router with page, navigate and asset handlers
//! - Wire up middleware (request ID, tracing, CORS, compression)
//! - Serve on a listener until the shutdown broadcast fires

use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::build::{BuildPipeline, Bundler, EsbuildCli, Stylesheet};
use crate::cache::PageCache;
use crate::config::schema::EngineConfig;
use crate::http::context::RequestContext;
use crate::http::{navigate, page};
use crate::render::{DefaultDocument, PageTemplate, QuickJsEngine, RenderEngine, ReloadBootstrap, ScriptEngine};
use crate::routing::route::{Props, StoreResolver};
use crate::routing::{Route, RouteTable};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EngineConfig>,
    pub routes: Arc<RouteTable>,
    pub store: Option<StoreResolver>,
    pub pipeline: Arc<BuildPipeline>,
    pub renderer: RenderEngine,
    pub template: Arc<dyn PageTemplate>,
    pub cache: Arc<PageCache>,
    pub stylesheet: Arc<Stylesheet>,
}

impl AppState {
    /// Store data for this request; empty without a store resolver.
    pub fn resolve_store(&self, ctx: &RequestContext) -> Props {
        self.store.as_ref().map(|store| store(ctx)).unwrap_or_default()
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.config.cache.default_ttl_secs)
    }

    /// Live-reload bootstrap for this request, outside production only.
    pub fn reload_bootstrap(&self, ctx: &RequestContext) -> Option<ReloadBootstrap> {
        if self.config.is_production() {
            return None;
        }
        let host = ctx.hostname().unwrap_or("localhost");
        Some(ReloadBootstrap {
            socket_url: format!("ws://{host}:{}/ws", self.config.hot_reload.port),
            route_id: ctx.path.clone(),
        })
    }
}

/// HTTP server for the rendering engine.
pub struct HttpServer {
    config: EngineConfig,
    routes: Vec<Route>,
    store: Option<StoreResolver>,
    bundler: Option<Arc<dyn Bundler>>,
    script_engine: Option<Arc<dyn ScriptEngine>>,
    template: Option<Arc<dyn PageTemplate>>,
    cache: Option<Arc<PageCache>>,
    stylesheet: Option<Arc<Stylesheet>>,
    extra: Option<Router>,
}

impl HttpServer {
    /// Create a server; routes declared in `config` are registered after
    /// any added in code.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            routes: Vec::new(),
            store: None,
            bundler: None,
            script_engine: None,
            template: None,
            cache: None,
            stylesheet: None,
            extra: None,
        }
    }

    /// Register a page route. Registration order is match order.
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Engine-wide store resolver.
    pub fn store<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&RequestContext) -> Props + Send + Sync + 'static,
    {
        self.store = Some(Arc::new(resolver));
        self
    }

    pub fn bundler(mut self, bundler: Arc<dyn Bundler>) -> Self {
        self.bundler = Some(bundler);
        self
    }

    pub fn script_engine(mut self, engine: Arc<dyn ScriptEngine>) -> Self {
        self.script_engine = Some(engine);
        self
    }

    pub fn template(mut self, template: Arc<dyn PageTemplate>) -> Self {
        self.template = Some(template);
        self
    }

    pub fn cache(mut self, cache: Arc<PageCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn stylesheet(mut self, stylesheet: Arc<Stylesheet>) -> Self {
        self.stylesheet = Some(stylesheet);
        self
    }

    /// Extra handlers (APIs, health checks) merged into the main router.
    pub fn merge(mut self, router: Router) -> Self {
        self.extra = Some(match self.extra.take() {
            Some(existing) => existing.merge(router),
            None => router,
        });
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Every route that will be served, code routes first.
    pub fn all_routes(&self) -> Vec<Route> {
        self.routes
            .iter()
            .cloned()
            .chain(self.config.routes.iter().cloned().map(Route::from))
            .collect()
    }

    /// Resolve defaults and build the handler state.
    pub fn into_state(self) -> (AppState, Option<Router>) {
        let routes = Arc::new(RouteTable::new(self.all_routes()));
        let bundler = self
            .bundler
            .unwrap_or_else(|| Arc::new(EsbuildCli::new(&self.config.bundler)));
        let script_engine = self
            .script_engine
            .unwrap_or_else(|| Arc::new(QuickJsEngine::new(&self.config.render)));

        let state = AppState {
            pipeline: Arc::new(BuildPipeline::new(bundler, &self.config)),
            renderer: RenderEngine::new(script_engine),
            template: self.template.unwrap_or_else(|| Arc::new(DefaultDocument)),
            cache: self.cache.unwrap_or_default(),
            stylesheet: self.stylesheet.unwrap_or_else(|| Arc::new(Stylesheet::fixed(""))),
            store: self.store,
            routes,
            config: Arc::new(self.config),
        };
        (state, self.extra)
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(state: AppState, extra: Option<Router>) -> Router {
        let assets = ServeDir::new(&state.config.frontend.assets_path);

        let mut router = Router::new()
            .route("/navigate", post(navigate::navigate))
            .route("/", get(page::page))
            .route("/{*path}", get(page::page))
            .nest_service("/assets", assets)
            .with_state(state);

        if let Some(extra) = extra {
            router = router.merge(extra);
        }

        router
            .layer(CompressionLayer::new())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods([Method::GET, Method::POST])
                    .allow_headers(Any),
            )
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> io::Result<()> {
        let addr = listener.local_addr()?;
        let (state, extra) = self.into_state();
        tracing::info!(
            address = %addr,
            env = %state.config.env,
            routes = state.routes.len(),
            "HTTP server starting"
        );

        let app = Self::build_router(state, extra);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
