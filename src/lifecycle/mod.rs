//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Checks → Metrics → Utility CSS → Hot reload (dev) → Janitor → Listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → background loops exit → HTTP drains
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: checks first, listeners last
//! - Any startup error is fatal

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{launch, StartupError};
