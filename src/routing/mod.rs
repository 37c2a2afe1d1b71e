//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (ordered route scan)
//!     → matcher.rs (structural pattern match, parameter capture)
//!     → Return: matched Route + RouteParams, or NoMatch
//!
//! Route registration (at startup):
//!     RouteConfig[] from TOML + Route[] from code
//!     → route.rs (head metadata, props resolver, middleware, TTL)
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes registered at startup, immutable at runtime
//! - Deterministic: first match in registration order wins
//! - Parameters live only for the request that produced them

pub mod matcher;
pub mod route;
pub mod router;

pub use matcher::{match_path, RouteParams};
pub use route::{CssLink, Head, JsLink, MetaTag, Props, PropsResolver, Route, StoreResolver};
pub use router::RouteTable;
