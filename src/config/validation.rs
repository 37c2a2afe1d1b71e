//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (addresses parse, ports distinct)
//! - Detect malformed and duplicate route patterns
//! - Check the frontend tree before serving (`check_app`)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - `validate_config` is pure; `check_app` touches the filesystem
//! - Route asset files are only checked in development

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::config::schema::EngineConfig;
use crate::render::document::{asset_url, ASSETS_PREFIX};
use crate::routing::Route;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid {field} `{value}`")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("hot reload port {0} collides with the listener port")]
    PortConflict(u16),

    #[error("route pattern `{0}` must start with `/`")]
    RoutePattern(String),

    #[error("route `{0}` is declared more than once")]
    DuplicateRoute(String),

    #[error("{what} not found: {}", path.display())]
    Missing { what: &'static str, path: PathBuf },
}

/// Semantic checks on a parsed configuration.
pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match config.listener.bind_address.parse::<SocketAddr>() {
        Ok(addr) if !config.is_production() && addr.port() == config.hot_reload.port => {
            errors.push(ValidationError::PortConflict(config.hot_reload.port));
        }
        Ok(_) => {}
        Err(_) => errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        }),
    }

    if config.observability.metrics_enabled && config.observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    for (field, value) in [
        ("bundler.esbuild_bin", &config.bundler.esbuild_bin),
        ("frontend.server_entry_point", &config.frontend.server_entry_point),
        ("frontend.client_entry_point", &config.frontend.client_entry_point),
    ] {
        if value.trim().is_empty() {
            errors.push(ValidationError::Empty { field });
        }
    }

    let mut seen = HashSet::new();
    for route in &config.routes {
        if !route.path.starts_with('/') {
            errors.push(ValidationError::RoutePattern(route.path.clone()));
        }
        if !seen.insert(route.path.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.path.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Filesystem checks run before the engine starts serving `routes`.
pub fn check_app(config: &EngineConfig, routes: &[Route]) -> Result<(), Vec<ValidationError>> {
    let mut errors = match validate_config(config) {
        Ok(()) => Vec::new(),
        Err(errors) => errors,
    };

    let frontend = &config.frontend;
    require_dir(&mut errors, "assets folder", Path::new(&frontend.assets_path));
    require_file(&mut errors, "server entry point", Path::new(&frontend.server_entry_point));
    require_file(&mut errors, "client entry point", Path::new(&frontend.client_entry_point));

    if config.tailwind.enabled {
        let tailwind_config = Path::new(&frontend.root_path).join(&config.tailwind.config_file);
        require_file(&mut errors, "tailwind config", &tailwind_config);
    }

    for route in routes {
        if !route.path().starts_with('/') {
            errors.push(ValidationError::RoutePattern(route.path().to_string()));
        }
    }

    if !config.is_production() {
        let assets = Path::new(&frontend.assets_path);
        for route in routes {
            let head = route.head();
            let hrefs = head
                .css_links
                .iter()
                .map(|link| (&link.href, "css file"))
                .chain(head.js_links.iter().map(|link| (&link.src, "js file")));
            for (href, what) in hrefs {
                if let Some(local) = local_asset(assets, href) {
                    require_file(&mut errors, what, &local);
                }
            }
        }
    }

    // Config routes are checked by both passes.
    let mut unique: Vec<ValidationError> = Vec::with_capacity(errors.len());
    for error in errors {
        if !unique.contains(&error) {
            unique.push(error);
        }
    }

    if unique.is_empty() {
        Ok(())
    } else {
        Err(unique)
    }
}

/// Filesystem path behind a route link, or `None` for external URLs.
fn local_asset(assets: &Path, href: &str) -> Option<PathBuf> {
    let url = asset_url(href);
    url.strip_prefix(ASSETS_PREFIX)
        .map(|relative| assets.join(relative))
}

fn require_dir(errors: &mut Vec<ValidationError>, what: &'static str, path: &Path) {
    if !path.is_dir() {
        errors.push(ValidationError::Missing { what, path: path.to_path_buf() });
    }
}

fn require_file(errors: &mut Vec<ValidationError>, what: &'static str, path: &Path) {
    if !path.is_file() {
        errors.push(ValidationError::Missing { what, path: path.to_path_buf() });
    }
}
