//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the engine.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::routing::route::{CssLink, JsLink, MetaTag};

/// Root configuration for the rendering engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Runtime environment. Controls minification and hot reload.
    pub env: Environment,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Frontend project layout.
    pub frontend: FrontendConfig,

    /// External bundler settings.
    pub bundler: BundlerConfig,

    /// Utility CSS compiler settings.
    pub tailwind: TailwindConfig,

    /// Script runtime limits.
    pub render: RenderConfig,

    /// Page cache settings.
    pub cache: CacheConfig,

    /// Live-reload settings (development only).
    pub hot_reload: HotReloadConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Static route declarations.
    pub routes: Vec<RouteConfig>,
}

impl EngineConfig {
    pub fn is_production(&self) -> bool {
        self.env == Environment::Production
    }
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Frontend project layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FrontendConfig {
    /// Frontend project root (holds `tailwind.config.js`).
    pub root_path: String,

    /// Source tree watched for changes in development.
    pub source_dir: String,

    /// Directory served under `/assets`.
    pub assets_path: String,

    /// Directory for requests that carry a file extension.
    pub public_path: String,

    /// Entry point of the server bundle.
    pub server_entry_point: String,

    /// Entry point of the browser bundle.
    pub client_entry_point: String,

    /// Favicon href placed in every document.
    pub favicon_path: String,

    /// Raw HTML appended to every document head.
    pub head_extra: Vec<String>,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            root_path: "frontend".to_string(),
            source_dir: "frontend/src".to_string(),
            assets_path: "frontend/src/assets".to_string(),
            public_path: "public".to_string(),
            server_entry_point: "frontend/src/entry-server.tsx".to_string(),
            client_entry_point: "frontend/src/entry-client.tsx".to_string(),
            favicon_path: "/favicon.ico".to_string(),
            head_extra: Vec::new(),
        }
    }
}

/// External bundler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BundlerConfig {
    /// Path or name of the esbuild executable.
    pub esbuild_bin: String,

    /// Language target for the server bundle.
    pub server_target: String,

    /// Asset file naming template passed to the bundler.
    pub asset_names: String,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            esbuild_bin: "esbuild".to_string(),
            server_target: "es2020".to_string(),
            asset_names: "assets/[name]".to_string(),
        }
    }
}

/// Utility CSS compiler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TailwindConfig {
    /// Compile utility CSS and inline it into every page.
    pub enabled: bool,

    /// Launcher command (e.g., "npx").
    pub command: String,

    /// Config file name, relative to `frontend.root_path`.
    pub config_file: String,
}

impl Default for TailwindConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: "npx".to_string(),
            config_file: "tailwind.config.js".to_string(),
        }
    }
}

/// Script runtime limits. `None` leaves the engine default in place.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RenderConfig {
    pub memory_limit_bytes: Option<usize>,
    pub max_stack_size_bytes: Option<usize>,
}

/// Page cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL applied to routes that do not set their own.
    pub default_ttl_secs: u64,

    /// How often expired entries are purged.
    pub evict_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 600,
            evict_interval_secs: 60,
        }
    }
}

/// Live-reload configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HotReloadConfig {
    /// Port of the websocket listener.
    pub port: u16,

    /// Directory names skipped when registering watches.
    pub ignore_dirs: Vec<String>,
}

impl Default for HotReloadConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            ignore_dirs: vec!["node_modules".to_string(), ".git".to_string()],
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A route declared in the config file. Props resolvers and middleware can
/// only be attached to routes registered in code.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path pattern, e.g. `/users/:id`.
    pub path: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub css_links: Vec<CssLink>,

    #[serde(default)]
    pub js_links: Vec<JsLink>,

    #[serde(default)]
    pub meta_tags: Vec<MetaTag>,

    /// Overrides `cache.default_ttl_secs`. Zero disables caching.
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,
}
