//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! luna.toml
//!     → loader.rs (read, parse, LUNA_ENV override)
//!     → validation.rs validate_config (semantic checks)
//!     → EngineConfig (validated, immutable)
//!     → validation.rs check_app (filesystem checks, before serving)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Every problem is reported, not just the first

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, ENV_VAR};
pub use schema::{EngineConfig, Environment, ListenerConfig, RouteConfig};
pub use validation::{check_app, validate_config, ValidationError};
