//! Directory-driven web framework core.
//!
//! An `app/` directory tree becomes a route tree; requests are matched
//! against it, the matched page is composed inside its layouts and streamed
//! as HTML with a hydration payload that a client router uses for soft
//! navigation.

pub mod client;
pub mod config;
pub mod http;
pub mod hydration;
pub mod lifecycle;
pub mod observability;
pub mod render;
pub mod routing;

pub use config::TreelineConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use render::{Component, ComponentRegistry, FragmentLoader, Loadable};
pub use routing::{RouteTable, RouteTree};
