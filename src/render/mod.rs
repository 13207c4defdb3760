//! Rendering subsystem.
//!
//! # Data Flow
//! ```text
//! RouteMatch
//!     → composition.rs (layouts root-first, page, nearest loading/error)
//!     → loader.rs (every unit resolved to a Component)
//!     → pipeline.rs (shell first, then deferred patches, then tail)
//!     → inject.rs (head metadata before </head>, payload before </body>)
//!     → response body
//! ```
//!
//! # Design Decisions
//! - Components are external capabilities; this module only composes them
//! - The shell is complete before anything is sent
//! - Errors after the first byte are reported and rendered inline

pub mod component;
pub mod composition;
pub mod document;
pub mod error;
pub mod inject;
pub mod loader;
pub mod node;
pub mod pipeline;

pub use component::{Component, Metadata, RenderContext};
pub use composition::RenderComposition;
pub use error::{LoadError, RenderError, ShellFailure};
pub use inject::{HtmlInjector, Injected};
pub use loader::{ComponentRegistry, Fragment, FragmentLoader, Loadable};
pub use node::Node;
pub use pipeline::{
    render, render_static, LoadedComposition, NoopObserver, RenderObserver, RenderOptions, RenderPhase,
    RenderStream,
};
