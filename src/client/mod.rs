//! Platform-neutral client core of the hydration/navigation protocol.
//!
//! A browser binding supplies `Transport`, `UnitResolver`, `Renderer` and
//! `History`; everything else (hydrate-once, latest-wins navigation, reload
//! fallback, observable route state) lives here.

pub mod router;
pub mod store;

pub use crate::hydration::extract_payload;
pub use router::{
    is_soft_navigable, ClientError, ClientRouter, History, NavigateOptions, NavigationOutcome,
    Renderer, Transport, UnitResolver, NAVIGATION_HEADER,
};
pub use store::{RouteState, RouteStore, Subscription};
