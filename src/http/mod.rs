//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, CORS, gzip)
//!     → GET /assets/*      → assets directory
//!     → POST /navigate     → navigate.rs (props for client-side navigation)
//!     → GET <path>         → page.rs (public file or assembled page)
//!                              └─ middleware.rs chain around the page handler
//!     → error.rs maps failures to 404 / 500
//! ```

pub mod context;
pub mod error;
pub mod middleware;
pub mod navigate;
pub mod page;
pub mod server;

pub use context::RequestContext;
pub use error::AppError;
pub use middleware::{compose, from_fn, handler, FnMiddleware, Handler, RouteMiddleware};
pub use navigate::{NavigateRequest, NavigateResponse};
pub use page::X_CACHE;
pub use server::{AppState, HttpServer};
