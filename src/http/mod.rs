//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, navigation flag, page props)
//!     → routing (RouteTable snapshot → RouteMatch)
//!     → render (composition → stream) or hydration (payload)
//!     → response.rs (streamed HTML / JSON)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{request_id, X_REQUEST_ID};
pub use server::{AppState, HttpServer, MANIFEST_PATH, STATIC_PREFIX};
