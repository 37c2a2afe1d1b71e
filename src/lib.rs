//! Luna: server-side rendering engine for JSX/TSX frontends.
//!
//! # Architecture Overview
//!
//! ```text
//!     GET /users/7                ┌──────────────────────────────────────────────┐
//!     ────────────────────────────┼─▶ http::page                                 │
//!                                 │     │ routing (first match wins)             │
//!                                 │     │ route middleware chain                 │
//!                                 │     ▼                                        │
//!                                 │   cache ── hit ──────────────┐               │
//!                                 │     │ miss                   │               │
//!                                 │     ▼                        │               │
//!                                 │   build (client ∥ server)    │               │
//!                                 │     ▼                        │               │
//!                                 │   render::engine (QuickJS)   │               │
//!                                 │     ▼                        ▼               │
//!     ◀───────────────────────────┼── render::document (page template)           │
//!                                 │                                              │
//!     ws://host:3001/ws           │   hot_reload: watcher → clear cache →        │
//!     ◀── "reload" ───────────────┼──             refresh CSS → broadcast        │
//!                                 └──────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod build;
pub mod cache;
pub mod config;
pub mod http;
pub mod render;
pub mod routing;

// Development tooling
pub mod hot_reload;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::EngineConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::Route;
