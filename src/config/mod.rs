//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! treeline.toml (optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → CLI overrides (main.rs)
//!     → TreelineConfig (validated, immutable)
//!     → shared via Arc with the HTTP layer
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the route tree is what reloads, not config
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    LogFormat, ObservabilityConfig, RenderConfig, RenderMode, RoutesConfig, ServerConfig,
    TreelineConfig,
};
pub use validation::{validate_config, ValidationError};
