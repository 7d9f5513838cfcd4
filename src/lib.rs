//! graph-sync: declarative bindings for a retained-mode graph-visualization
//! engine.
//!
//! The crate keeps engine-owned handles (rules, style classes,
//! transformations, layers, overlays, event listeners) in step with a
//! declarative component tree, and releases each of them exactly once.

pub mod api;
pub mod core;
pub mod engine;
pub mod error;
pub mod telemetry;

pub use api::{Binding, EngineHost, EngineScope, HostProps, Lifecycle};
pub use engine::{Engine, HeadlessEngine};
pub use error::{BindingError, BindingResult, EngineRejection, EngineResult};
