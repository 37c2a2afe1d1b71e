//! Bundle building subsystem.
//!
//! # Data Flow
//! ```text
//! Page miss (props, store, route path)
//!     → pipeline.rs build()
//!         ├─ build_client → bundler.rs (browser bundle)
//!         └─ build_server → bundler.rs (server bundle + shims.rs banner)
//!     → join: Bundles { client, server } or BuildError
//!
//! Utility CSS:
//!     tailwind.rs Stylesheet::refresh() at startup and on source change
//! ```

pub mod bundler;
pub mod pipeline;
pub mod shims;
pub mod tailwind;

pub use bundler::{BuildTarget, BundleRequest, Bundler, EsbuildCli, OutputFile};
pub use pipeline::{BuildPipeline, BuildResult, Bundles};
pub use tailwind::{Stylesheet, TailwindCompiler, TailwindError};

/// Errors raised while producing bundles.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{target} bundle failed: {message}")]
    Bundler { target: BuildTarget, message: String },

    #[error("{target} bundle output unreadable: {source}")]
    Output {
        target: BuildTarget,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize build constants: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("build failed: {}", describe_pipeline(client.as_deref(), server.as_deref()))]
    Pipeline {
        client: Option<Box<BuildError>>,
        server: Option<Box<BuildError>>,
    },
}

fn describe_pipeline(client: Option<&BuildError>, server: Option<&BuildError>) -> String {
    match (client, server) {
        (Some(c), Some(s)) => format!("client: {c}; server: {s}"),
        (Some(c), None) => format!("client: {c}"),
        (None, Some(s)) => format!("server: {s}"),
        (None, None) => "unknown".to_string(),
    }
}
