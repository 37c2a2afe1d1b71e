//! Rendering subsystem.
//!
//! # Data Flow
//! ```text
//! server bundle → engine.rs (QuickJS, fresh context) → markup
//! markup + head + bundles → document.rs (PageTemplate) → HTML document
//! ```

pub mod document;
pub mod engine;

pub use document::{DefaultDocument, PageData, PageTemplate, ReloadBootstrap, ScriptTag, StyleTag, TemplateError};
pub use engine::{QuickJsEngine, RenderEngine, RenderError, RenderRequest, ScriptEngine};
