//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup, and on change in development):
//!     app/ directory
//!     → builder.rs (scan, classify segments and special files, link)
//!     → RouteTree (immutable arena)
//!     → table.rs (atomic swap into the shared RouteTable)
//!
//! Incoming Request (path)
//!     → matcher.rs (static > dynamic > catch-all walk)
//!     → resolver.rs (layout chain, nearest fallbacks)
//!     → Return: RouteMatch or no match
//! ```
//!
//! # Design Decisions
//! - Trees are immutable at runtime; rebuilds replace the whole tree
//! - No regex in the hot path (segment lookups only)
//! - Deterministic: same tree and path always produce the same match
//! - At most one dynamic and one catch-all child per directory

pub mod builder;
pub mod matcher;
pub mod resolver;
pub mod segment;
pub mod table;
pub mod tree;
pub mod watcher;

pub use builder::{BuildError, BuildOptions};
pub use matcher::{normalize_path, Params, RouteMatch};
pub use segment::{SegmentKind, SpecialFile};
pub use table::RouteTable;
pub use tree::{NodeId, RouteFile, RouteNode, RouteTree, UnitIdMode};
pub use watcher::RouteWatcher;
