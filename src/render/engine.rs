//! Server bundle execution.
//!
//! # Responsibilities
//! - Run the server bundle in an isolated script context
//! - Call its exported `render(path)` and extract `html`
//! - Keep script execution off the async worker threads
//!
//! # Data Flow
//! ```text
//! RenderEngine::render_server(bundle, path)
//!     → spawn_blocking
//!     → ScriptEngine::execute(RenderRequest)
//!         → fresh runtime + context
//!         → URL shim, window.location.pathname
//!         → module "server" declared and evaluated
//!         → render(path) → (await) → .html
//!     → markup or RenderError
//! ```
//!
//! # Design Decisions
//! - One runtime per call; nothing leaks between requests
//! - Exceptions are caught and surfaced with the script's message
//! - No execution timeout; limits are memory and stack only

use std::sync::Arc;
use std::time::Instant;

use rquickjs::{CatchResultExt, CaughtError, Context, Function, Module, Object, Runtime, Value};

use crate::config::schema::RenderConfig;
use crate::observability::metrics;

/// Module name the bundle is declared under.
const MODULE_NAME: &str = "server";

const URL_SHIM: &str = "globalThis.URL = class URL { constructor(href) { this.href = String(href); } toString() { return this.href; } };";

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("script runtime unavailable: {0}")]
    Runtime(String),

    #[error("script error: {0}")]
    Script(String),

    #[error("render() returned no html")]
    MissingMarkup,

    #[error("render task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// One server render.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Complete server bundle (ES module).
    pub source: String,
    /// Path passed to `render` and exposed as `window.location.pathname`.
    pub route_path: String,
}

/// Something that can execute a server bundle and return its markup.
pub trait ScriptEngine: Send + Sync {
    fn execute(&self, request: &RenderRequest) -> Result<String, RenderError>;
}

/// Embedded QuickJS.
#[derive(Debug, Clone, Default)]
pub struct QuickJsEngine {
    memory_limit: Option<usize>,
    max_stack_size: Option<usize>,
}

impl QuickJsEngine {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            memory_limit: config.memory_limit_bytes,
            max_stack_size: config.max_stack_size_bytes,
        }
    }
}

impl ScriptEngine for QuickJsEngine {
    fn execute(&self, request: &RenderRequest) -> Result<String, RenderError> {
        let runtime = Runtime::new().map_err(|e| RenderError::Runtime(e.to_string()))?;
        if let Some(limit) = self.memory_limit {
            runtime.set_memory_limit(limit);
        }
        if let Some(size) = self.max_stack_size {
            runtime.set_max_stack_size(size);
        }
        let context = Context::full(&runtime).map_err(|e| RenderError::Runtime(e.to_string()))?;

        context.with(|ctx| -> Result<String, RenderError> {
            ctx.eval::<(), _>(URL_SHIM).catch(&ctx).map_err(script_error)?;

            let globals = ctx.globals();
            let location = Object::new(ctx.clone()).catch(&ctx).map_err(script_error)?;
            location
                .set("pathname", request.route_path.as_str())
                .catch(&ctx)
                .map_err(script_error)?;
            let window = Object::new(ctx.clone()).catch(&ctx).map_err(script_error)?;
            window.set("location", location).catch(&ctx).map_err(script_error)?;
            globals.set("window", window).catch(&ctx).map_err(script_error)?;

            let declared = Module::declare(ctx.clone(), MODULE_NAME, request.source.as_str())
                .catch(&ctx)
                .map_err(script_error)?;
            let (module, evaluated) = declared.eval().catch(&ctx).map_err(script_error)?;
            evaluated.finish::<()>().catch(&ctx).map_err(script_error)?;

            let render: Function = module.get("render").catch(&ctx).map_err(script_error)?;
            let value: Value = render
                .call((request.route_path.as_str(),))
                .catch(&ctx)
                .map_err(script_error)?;

            let value = match value.clone().into_promise() {
                Some(promise) => promise.finish::<Value>().catch(&ctx).map_err(script_error)?,
                None => value,
            };
            let result: Object = value.into_object().ok_or(RenderError::MissingMarkup)?;

            let html: Option<String> = result.get("html").catch(&ctx).map_err(script_error)?;
            html.ok_or(RenderError::MissingMarkup)
        })
    }
}

fn script_error(e: CaughtError<'_>) -> RenderError {
    RenderError::Script(e.to_string())
}

/// Async front for a [`ScriptEngine`].
#[derive(Clone)]
pub struct RenderEngine {
    engine: Arc<dyn ScriptEngine>,
}

impl RenderEngine {
    pub fn new(engine: Arc<dyn ScriptEngine>) -> Self {
        Self { engine }
    }

    /// Execute `bundle` and return the markup for `route_path`.
    pub async fn render_server(&self, bundle: String, route_path: &str) -> Result<String, RenderError> {
        let engine = Arc::clone(&self.engine);
        let request = RenderRequest {
            source: bundle,
            route_path: route_path.to_string(),
        };

        let start = Instant::now();
        let result = tokio::task::spawn_blocking(move || engine.execute(&request)).await?;
        metrics::record_render(result.is_ok(), start);

        if let Err(e) = &result {
            tracing::error!(path = %route_path, error = %e, "Server render failed");
        }
        result
    }
}
