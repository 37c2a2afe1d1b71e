//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use tempfile::TempDir;
use tokio::net::TcpListener;

use luna_ssr::build::{BuildError, BuildTarget, BundleRequest, Bundler, OutputFile};
use luna_ssr::cache::PageCache;
use luna_ssr::render::{RenderError, RenderRequest, ScriptEngine};
use luna_ssr::{EngineConfig, HttpServer, Shutdown};

/// Bundler that records requests and emits a small module per target.
#[derive(Default)]
pub struct FakeBundler {
    pub requests: Mutex<Vec<BundleRequest>>,
    failing: Mutex<Vec<BuildTarget>>,
    /// Cleared while the server bundle builds, as a source change would.
    clear_during_build: Mutex<Option<Arc<PageCache>>>,
}

impl FakeBundler {
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn set_failing(&self, fail: bool) {
        let targets = if fail {
            vec![BuildTarget::Client, BuildTarget::Server]
        } else {
            Vec::new()
        };
        *self.failing.lock().unwrap() = targets;
    }

    /// Fail only `target`; the other build still succeeds.
    pub fn fail_target(&self, target: BuildTarget) {
        *self.failing.lock().unwrap() = vec![target];
    }

    pub fn clear_during_build(&self, cache: Arc<PageCache>) {
        *self.clear_during_build.lock().unwrap() = Some(cache);
    }
}

impl Bundler for FakeBundler {
    fn bundle(&self, request: BundleRequest) -> BoxFuture<'_, Result<Vec<OutputFile>, BuildError>> {
        Box::pin(async move {
            let target = request.target;
            self.requests.lock().unwrap().push(request);
            if target == BuildTarget::Server {
                if let Some(cache) = self.clear_during_build.lock().unwrap().take() {
                    cache.clear();
                }
            }
            if self.failing.lock().unwrap().contains(&target) {
                return Err(BuildError::Bundler {
                    target,
                    message: "Unexpected \"<\"".into(),
                });
            }
            let js = match target {
                BuildTarget::Client => "console.log('hydrate')",
                BuildTarget::Server => "export function render(p){return {html:p}}",
            };
            Ok(vec![
                OutputFile {
                    path: format!("out/{target}.js").into(),
                    contents: js.as_bytes().to_vec(),
                },
                OutputFile {
                    path: format!("out/{target}.css").into(),
                    contents: format!(".{target}{{color:red}}").into_bytes(),
                },
            ])
        })
    }
}

/// Script engine that echoes the route path as markup.
#[derive(Default)]
pub struct FakeEngine {
    pub runs: AtomicUsize,
}

impl ScriptEngine for FakeEngine {
    fn execute(&self, request: &RenderRequest) -> Result<String, RenderError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(format!("<main data-path=\"{}\">rendered</main>", request.route_path))
    }
}

/// Config whose frontend paths live under `dir`.
pub fn test_config(dir: &TempDir) -> EngineConfig {
    let root = dir.path();
    let mut config = EngineConfig::default();
    config.frontend.root_path = root.display().to_string();
    config.frontend.source_dir = root.join("src").display().to_string();
    config.frontend.assets_path = root.join("src/assets").display().to_string();
    config.frontend.public_path = root.join("public").display().to_string();
    config.frontend.server_entry_point = root.join("src/entry-server.tsx").display().to_string();
    config.frontend.client_entry_point = root.join("src/entry-client.tsx").display().to_string();
    config.tailwind.enabled = false;
    config
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub cache: Arc<PageCache>,
    pub shutdown: Shutdown,
    pub bundler: Arc<FakeBundler>,
    pub engine: Arc<FakeEngine>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Run `server` with fake build and render components on an ephemeral port.
pub async fn spawn(server: HttpServer) -> TestServer {
    let bundler = Arc::new(FakeBundler::default());
    let engine = Arc::new(FakeEngine::default());
    let cache = Arc::new(PageCache::new());
    let server = server
        .bundler(bundler.clone())
        .script_engine(engine.clone())
        .cache(Arc::clone(&cache));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });

    TestServer {
        addr,
        cache,
        shutdown,
        bundler,
        engine,
    }
}
