//! Client-side navigation protocol.
//!
//! # Flow
//! ```text
//! hydrate(payload)            (once, from the embedded document payload)
//!     → resolve unit ids → Renderer::hydrate → store
//!
//! navigate(href)
//!     → History::push / replace
//!     → Transport::fetch_payload (navigation request)
//!     → resolve unit ids
//!     → Renderer::render → store
//!     any failure → History::reload(href)
//! ```
//!
//! # Design Decisions
//! - Latest wins: every navigation takes a ticket; a navigation whose ticket
//!   is no longer current after an await is discarded
//! - A full reload is always a valid fallback, so failures never leave the
//!   client on a half-rendered page
//! - Platform bindings implement the four traits; this core has no browser
//!   dependency

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures_util::future::try_join_all;
use thiserror::Error;
use url::Url;

use crate::client::store::{RouteState, RouteStore};
use crate::hydration::HydrationPayload;

/// Header that marks a navigation (payload) request.
pub const NAVIGATION_HEADER: &str = "x-treeline-navigation";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("router already hydrated")]
    AlreadyHydrated,

    #[error("payload request failed: {0}")]
    Transport(String),

    #[error("failed to resolve unit '{id}': {message}")]
    Resolve { id: String, message: String },

    #[error("render failed: {0}")]
    Render(String),
}

/// Fetches the navigation payload for a URL.
pub trait Transport {
    fn fetch_payload(
        &self,
        href: &str,
    ) -> impl Future<Output = Result<HydrationPayload, ClientError>> + Send;
}

/// Turns an opaque unit id into a loaded unit.
pub trait UnitResolver {
    type Unit: Send;

    fn resolve(&self, id: &str) -> impl Future<Output = Result<Self::Unit, ClientError>> + Send;
}

/// Mounts resolved units. `units` holds the layouts outermost first, then
/// the page.
pub trait Renderer<U> {
    fn hydrate(&self, units: Vec<U>, payload: &HydrationPayload) -> Result<(), ClientError>;

    fn render(&self, units: Vec<U>, payload: &HydrationPayload) -> Result<(), ClientError>;
}

/// Session history.
pub trait History {
    fn push(&self, href: &str);

    fn replace(&self, href: &str);

    /// Full document load, the escape hatch for any navigation failure.
    fn reload(&self, href: &str);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Replace the current history entry instead of pushing.
    pub replace: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    Rendered,
    /// A later navigation started before this one finished.
    Superseded,
    /// The navigation failed and a full reload was requested.
    Reloaded,
}

#[derive(Debug)]
pub struct ClientRouter<T, U, R, H> {
    transport: T,
    resolver: U,
    renderer: R,
    history: H,
    store: RouteStore,
    hydrated: AtomicBool,
    sequence: AtomicU64,
}

impl<T, U, R, H> ClientRouter<T, U, R, H>
where
    T: Transport,
    U: UnitResolver,
    R: Renderer<U::Unit>,
    H: History,
{
    pub fn new(transport: T, resolver: U, renderer: R, history: H, store: RouteStore) -> Self {
        Self {
            transport,
            resolver,
            renderer,
            history,
            store,
            hydrated: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &RouteStore {
        &self.store
    }

    /// Take over the server-rendered document. Runs at most once.
    pub async fn hydrate(
        &self,
        href: impl Into<String>,
        payload: HydrationPayload,
    ) -> Result<(), ClientError> {
        if self.hydrated.swap(true, Ordering::SeqCst) {
            return Err(ClientError::AlreadyHydrated);
        }
        let units = self.resolve_units(&payload).await?;
        self.renderer.hydrate(units, &payload)?;
        self.store.set(RouteState {
            href: href.into(),
            payload,
        });
        Ok(())
    }

    /// Soft-navigate to `href`.
    pub async fn navigate(&self, href: &str, options: NavigateOptions) -> NavigationOutcome {
        let ticket = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;

        if options.replace {
            self.history.replace(href);
        } else {
            self.history.push(href);
        }

        match self.load(href, ticket).await {
            Ok(Some(payload)) => {
                self.store.set(RouteState {
                    href: href.to_string(),
                    payload,
                });
                NavigationOutcome::Rendered
            }
            Ok(None) => NavigationOutcome::Superseded,
            Err(_) if !self.is_current(ticket) => NavigationOutcome::Superseded,
            Err(e) => {
                tracing::warn!(href, error = %e, "Soft navigation failed, reloading");
                self.history.reload(href);
                NavigationOutcome::Reloaded
            }
        }
    }

    /// `Ok(None)` when superseded at any await point.
    async fn load(&self, href: &str, ticket: u64) -> Result<Option<HydrationPayload>, ClientError> {
        let payload = self.transport.fetch_payload(href).await?;
        if !self.is_current(ticket) {
            return Ok(None);
        }
        let units = self.resolve_units(&payload).await?;
        if !self.is_current(ticket) {
            return Ok(None);
        }
        self.renderer.render(units, &payload)?;
        Ok(Some(payload))
    }

    async fn resolve_units(&self, payload: &HydrationPayload) -> Result<Vec<U::Unit>, ClientError> {
        try_join_all(payload.unit_ids().map(|id| self.resolver.resolve(id))).await
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.sequence.load(Ordering::SeqCst) == ticket
    }
}

/// Whether a link click should become a soft navigation.
///
/// Only same-origin http(s) links that change the path or query qualify;
/// downloads and fragment-only changes stay with the browser.
pub fn is_soft_navigable(current: &Url, href: &str, download: bool) -> bool {
    if download || href.starts_with('#') {
        return false;
    }
    let Ok(target) = current.join(href) else {
        return false;
    };
    if !matches!(target.scheme(), "http" | "https") || target.origin() != current.origin() {
        return false;
    }
    let fragment_only = target.path() == current.path()
        && target.query() == current.query()
        && target.fragment().is_some();
    !fragment_only
}
