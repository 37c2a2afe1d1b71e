//! Per-request bundle builds.
//!
//! # Responsibilities
//! - Serialize props and store into the bundler's define table
//! - Build the browser and server bundles concurrently
//! - Classify output files into CSS and JS text
//!
//! # Design Decisions
//! - Fork-join with `tokio::join!`: both branches always finish
//! - A failed branch fails the whole build; partial results are dropped
//! - Minification only in production
//! - The server bundle always carries the host shim banner

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::build::bundler::{BuildTarget, BundleRequest, Bundler, OutputFile};
use crate::build::shims::server_banner;
use crate::build::BuildError;
use crate::config::schema::EngineConfig;
use crate::config::Environment;
use crate::observability::metrics;
use crate::routing::route::Props;

/// Identifier the server bundle can read to learn which path it renders.
pub const ROUTE_PATH_DEFINE: &str = "__LUNA_ROUTE_PATH__";

/// Text output of one bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildResult {
    pub js: String,
    pub css: String,
}

impl BuildResult {
    /// Sort output files into the CSS and JS buckets by suffix.
    /// Anything else (copied assets, source maps) is ignored.
    pub fn from_outputs(files: Vec<OutputFile>) -> Self {
        let mut result = BuildResult::default();
        for file in files {
            let name = file.path.to_string_lossy();
            let bucket = if name.ends_with(".css") {
                &mut result.css
            } else if name.ends_with(".js") {
                &mut result.js
            } else {
                continue;
            };
            if !bucket.is_empty() {
                bucket.push('\n');
            }
            bucket.push_str(&String::from_utf8_lossy(&file.contents));
        }
        result
    }
}

/// Both bundles of one request.
#[derive(Debug, Clone)]
pub struct Bundles {
    pub client: BuildResult,
    pub server: BuildResult,
}

/// Builds browser and server bundles for a request.
pub struct BuildPipeline {
    bundler: Arc<dyn Bundler>,
    client_entry: PathBuf,
    server_entry: PathBuf,
    server_target: String,
    env: Environment,
}

impl BuildPipeline {
    pub fn new(bundler: Arc<dyn Bundler>, config: &EngineConfig) -> Self {
        Self {
            bundler,
            client_entry: PathBuf::from(&config.frontend.client_entry_point),
            server_entry: PathBuf::from(&config.frontend.server_entry_point),
            server_target: config.bundler.server_target.clone(),
            env: config.env,
        }
    }

    /// Build the browser bundle.
    pub async fn build_client(&self, props: &Props, store: &Props) -> Result<BuildResult, BuildError> {
        let request = BundleRequest {
            target: BuildTarget::Client,
            entry_point: self.client_entry.clone(),
            defines: base_defines(props, store)?,
            minify: self.env == Environment::Production,
            banner: None,
            esm_target: None,
        };
        self.run(request).await
    }

    /// Build the server bundle for `route_path`.
    pub async fn build_server(
        &self,
        route_path: &str,
        props: &Props,
        store: &Props,
    ) -> Result<BuildResult, BuildError> {
        let mut defines = base_defines(props, store)?;
        defines.insert(ROUTE_PATH_DEFINE.to_string(), to_json(route_path)?);

        let request = BundleRequest {
            target: BuildTarget::Server,
            entry_point: self.server_entry.clone(),
            defines,
            minify: self.env == Environment::Production,
            banner: Some(server_banner(self.env)),
            esm_target: Some(self.server_target.clone()),
        };
        self.run(request).await
    }

    /// Build both bundles concurrently and join.
    pub async fn build(&self, route_path: &str, props: &Props, store: &Props) -> Result<Bundles, BuildError> {
        let (client, server) = tokio::join!(
            self.build_client(props, store),
            self.build_server(route_path, props, store),
        );

        match (client, server) {
            (Ok(client), Ok(server)) => Ok(Bundles { client, server }),
            (client, server) => Err(BuildError::Pipeline {
                client: client.err().map(Box::new),
                server: server.err().map(Box::new),
            }),
        }
    }

    async fn run(&self, request: BundleRequest) -> Result<BuildResult, BuildError> {
        let target = request.target;
        let start = Instant::now();
        let outcome = self.bundler.bundle(request).await.map(BuildResult::from_outputs);

        metrics::record_build(target.as_str(), outcome.is_ok(), start);
        match &outcome {
            Ok(result) => tracing::debug!(
                target = %target,
                js_bytes = result.js.len(),
                css_bytes = result.css.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Bundle built"
            ),
            Err(e) => tracing::error!(target = %target, error = %e, "Bundle failed"),
        }
        outcome
    }
}

fn base_defines(props: &Props, store: &Props) -> Result<BTreeMap<String, String>, BuildError> {
    let mut defines = BTreeMap::new();
    defines.insert("props".to_string(), to_json(props)?);
    defines.insert("store".to_string(), to_json(store)?);
    defines.insert("global".to_string(), "globalThis".to_string());
    Ok(defines)
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, BuildError> {
    serde_json::to_string(value).map_err(BuildError::Serialize)
}
