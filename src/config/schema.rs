//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from `treeline.toml`.
//! Every section has defaults, so an empty file (or no file) is valid.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::routing::{BuildOptions, UnitIdMode};

/// Root configuration for the framework server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TreelineConfig {
    /// Listener settings.
    pub server: ServerConfig,

    /// Route tree source and build options.
    pub routes: RoutesConfig,

    /// Rendering posture and client assets.
    pub render: RenderConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:3000").
    pub bind_address: String,

    /// Request timeout in seconds. Covers the whole streamed response.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Route tree configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Root of the route hierarchy.
    pub app_dir: PathBuf,

    /// Unit file extensions, without the dot.
    pub extensions: Vec<String>,

    /// Fail the build on conflicting dynamic or catch-all directories.
    pub strict: bool,

    /// Rebuild the tree when the app directory changes. Only honored in
    /// development mode.
    pub watch: bool,

    /// Quiet period before a rebuild, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            app_dir: PathBuf::from("app"),
            extensions: vec!["html".to_string(), "htm".to_string()],
            strict: false,
            watch: true,
            debounce_ms: 100,
        }
    }
}

/// Rendering posture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Readable unit ids, error details in responses, no fragment caching.
    #[default]
    Development,
    /// Hashed unit ids, generic error pages, cached fragments.
    Production,
}

/// Render configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    pub mode: RenderMode,

    /// Client entry script referenced from every document head.
    pub client_entry: Option<String>,

    /// Directory served under `/_treeline/static`.
    pub public_dir: Option<PathBuf>,

    /// URL prefix for client unit modules in the manifest.
    pub asset_prefix: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mode: RenderMode::Development,
            client_entry: None,
            public_dir: None,
            asset_prefix: "/_treeline/static/app".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
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
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Log format. `None` picks json in production, pretty otherwise.
    pub log_format: Option<LogFormat>,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: None,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

impl TreelineConfig {
    pub fn is_production(&self) -> bool {
        self.render.mode == RenderMode::Production
    }

    pub fn log_format(&self) -> LogFormat {
        self.observability.log_format.unwrap_or(if self.is_production() {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        })
    }

    /// Route build options derived from the routes section and render mode.
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            extensions: self.routes.extensions.clone(),
            strict: self.routes.strict,
            id_mode: if self.is_production() {
                UnitIdMode::Hashed
            } else {
                UnitIdMode::Path
            },
        }
    }

    pub fn watch_enabled(&self) -> bool {
        self.routes.watch && !self.is_production()
    }
}
