//! Streaming render pipeline.
//!
//! # States
//! ```text
//! Pending → ShellBuilding → ShellReady → Streaming → Complete
//!                        ↘ ShellFailed
//! ```
//!
//! # Data Flow
//! ```text
//! RenderComposition
//!     → LoadedComposition (every unit resolved; load failure = shell failure)
//!     → shell: page wrapped by layouts, inner to outer, written to one string
//!         deferred boundaries → loading fallback + pending future
//!     → RenderStream (mpsc): shell head, then one patch per resolved
//!       boundary (completion order), then the held-back `</body>` tail
//! ```
//!
//! # Design Decisions
//! - Nothing is sent until the whole shell rendered, so a shell failure can
//!   still become a complete 404/500 response
//! - After the first chunk the response is committed: boundary failures are
//!   reported to the observer and rendered inline
//! - Boundaries resolve concurrently; one slow boundary never blocks siblings
//! - One producer task per response; it stops as soon as the consumer is gone

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Bytes;
use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, Stream, StreamExt};
use futures_util::FutureExt;
use tokio::sync::mpsc;

use crate::render::component::{Component, Metadata, RenderContext};
use crate::render::composition::RenderComposition;
use crate::render::document::{self, PATCH_RUNTIME};
use crate::render::error::{LoadError, RenderError, ShellFailure};
use crate::render::loader::Loadable;
use crate::render::node::{escape_html, Deferred, Node};
use crate::routing::Params;

/// Pipeline state, reported to observers on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    Pending,
    ShellBuilding,
    ShellReady,
    Streaming,
    Complete,
    ShellFailed,
}

/// Lifecycle callbacks for one render.
pub trait RenderObserver: Send + Sync {
    fn on_phase(&self, _phase: RenderPhase) {}

    /// The shell rendered; bytes are about to flow.
    fn on_shell_ready(&self) {}

    /// The shell failed; nothing was sent.
    fn on_shell_error(&self, _error: &ShellFailure) {}

    /// A deferred boundary failed after the response was committed.
    fn on_error(&self, _error: &RenderError) {}
}

/// Observer that ignores every callback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RenderObserver for NoopObserver {}

/// Knobs for a single render.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Include error messages in inline fallbacks (development posture).
    pub expose_errors: bool,
    /// Chunks buffered between the producer task and the response body.
    pub channel_capacity: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            expose_errors: false,
            channel_capacity: 16,
        }
    }
}

/// A composition whose units have all been resolved to components.
#[derive(Clone)]
pub struct LoadedComposition {
    layouts: Vec<Arc<dyn Component>>,
    page: Arc<dyn Component>,
    loading: Option<Arc<dyn Component>>,
    error: Option<Arc<dyn Component>>,
    not_found: Option<Arc<dyn Component>>,
}

impl LoadedComposition {
    pub fn load(composition: &RenderComposition, loader: &dyn Loadable) -> Result<Self, LoadError> {
        let layouts = composition
            .layouts
            .iter()
            .map(|unit| loader.resolve(unit))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            layouts,
            page: loader.resolve(&composition.page)?,
            loading: composition
                .loading
                .as_ref()
                .map(|unit| loader.resolve(unit))
                .transpose()?,
            error: composition
                .error
                .as_ref()
                .map(|unit| loader.resolve(unit))
                .transpose()?,
            not_found: composition
                .not_found
                .as_ref()
                .map(|unit| loader.resolve(unit))
                .transpose()?,
        })
    }

    /// Metadata merged from the outermost layout down to the page.
    pub fn metadata(&self, params: &Params) -> Metadata {
        let mut merged = Metadata::default();
        for component in self.layouts.iter().chain(std::iter::once(&self.page)) {
            if let Some(meta) = component.metadata(params) {
                merged.merge(meta);
            }
        }
        merged
    }
}

/// Byte stream of one rendered response.
#[derive(Debug)]
pub struct RenderStream {
    rx: mpsc::Receiver<Bytes>,
}

impl Stream for RenderStream {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        self.rx.poll_recv(cx)
    }
}

type PendingBoundary = (usize, BoxFuture<'static, Result<Node, RenderError>>);

/// Loading fallback markup, rendered at most once per response.
struct LoadingFallback {
    component: Option<Arc<dyn Component>>,
    markup: Option<String>,
    cx: RenderContext,
}

impl LoadingFallback {
    fn markup(&mut self) -> Result<&str, RenderError> {
        if self.markup.is_none() {
            let markup = match &self.component {
                Some(component) => render_static(component.render(&self.cx, Node::Empty)?),
                None => String::new(),
            };
            self.markup = Some(markup);
        }
        Ok(self.markup.as_deref().unwrap_or_default())
    }
}

struct MarkupWriter<'a> {
    out: String,
    next_id: &'a mut usize,
    pending: Vec<PendingBoundary>,
    loading: &'a mut LoadingFallback,
}

impl<'a> MarkupWriter<'a> {
    fn new(next_id: &'a mut usize, loading: &'a mut LoadingFallback) -> Self {
        Self {
            out: String::new(),
            next_id,
            pending: Vec::new(),
            loading,
        }
    }

    fn write(&mut self, node: Node) -> Result<(), RenderError> {
        match node {
            Node::Empty => {}
            Node::Text(text) => self.out.push_str(&escape_html(&text)),
            Node::Raw(markup) => self.out.push_str(&markup),
            Node::List(nodes) => {
                for node in nodes {
                    self.write(node)?;
                }
            }
            Node::Deferred(Deferred { fallback, content }) => {
                let id = *self.next_id;
                *self.next_id += 1;
                self.out
                    .push_str(&format!("<!--$?--><template id=\"tl-b{}\"></template>", id));
                match fallback {
                    Some(fallback) => self.write(*fallback)?,
                    None => {
                        let markup = self.loading.markup()?;
                        self.out.push_str(markup);
                    }
                }
                self.out.push_str("<!--/$-->");
                self.pending.push((id, content));
            }
        }
        Ok(())
    }
}

/// Render a node to a string in one pass. Deferred boundaries are not
/// awaited; their own fallbacks stand in.
pub fn render_static(node: Node) -> String {
    let mut out = String::new();
    write_static(&mut out, node);
    out
}

fn write_static(out: &mut String, node: Node) {
    match node {
        Node::Empty => {}
        Node::Text(text) => out.push_str(&escape_html(&text)),
        Node::Raw(markup) => out.push_str(&markup),
        Node::List(nodes) => {
            for node in nodes {
                write_static(out, node);
            }
        }
        Node::Deferred(Deferred { fallback, .. }) => {
            if let Some(fallback) = fallback {
                write_static(out, *fallback);
            }
        }
    }
}

/// Render a composition into a byte stream.
///
/// Returns `Err` only while nothing has been produced yet. Must be called
/// from within a Tokio runtime.
pub fn render(
    loaded: LoadedComposition,
    cx: RenderContext,
    observer: Arc<dyn RenderObserver>,
    options: &RenderOptions,
) -> Result<RenderStream, ShellFailure> {
    observer.on_phase(RenderPhase::Pending);
    observer.on_phase(RenderPhase::ShellBuilding);

    let mut loading = LoadingFallback {
        component: loaded.loading.clone(),
        markup: None,
        cx: cx.clone(),
    };
    let mut next_id = 0;

    let shell = build_shell(&loaded, &cx, &mut next_id, &mut loading);
    let (shell, pending) = match shell {
        Ok(shell) => shell,
        Err(err) => {
            let failure = ShellFailure::from(err);
            observer.on_phase(RenderPhase::ShellFailed);
            observer.on_shell_error(&failure);
            return Err(failure);
        }
    };

    let (head, tail) = match shell.rfind("</body>") {
        Some(at) => (shell[..at].to_string(), shell[at..].to_string()),
        None => (shell, String::new()),
    };

    observer.on_phase(RenderPhase::ShellReady);
    observer.on_shell_ready();

    let (tx, rx) = mpsc::channel(options.channel_capacity.max(1));
    let task = StreamTask {
        tx,
        observer,
        error: loaded.error.clone(),
        not_found: loaded.not_found.clone(),
        loading,
        cx,
        next_id,
        expose_errors: options.expose_errors,
    };
    tokio::spawn(task.run(head, pending, tail));

    Ok(RenderStream { rx })
}

fn build_shell(
    loaded: &LoadedComposition,
    cx: &RenderContext,
    next_id: &mut usize,
    loading: &mut LoadingFallback,
) -> Result<(String, Vec<PendingBoundary>), RenderError> {
    let mut node = loaded.page.render(cx, Node::Empty)?;
    for layout in loaded.layouts.iter().rev() {
        node = layout.render(cx, node)?;
    }

    let mut writer = MarkupWriter::new(next_id, loading);
    writer.write(node)?;
    let MarkupWriter { out, pending, .. } = writer;

    let out = if contains_ignore_case(&out, "<html") {
        out
    } else {
        document::default_document(&out)
    };
    Ok((out, pending))
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .as_bytes()
        .windows(needle.len())
        .any(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}

type Tagged = BoxFuture<'static, (usize, Result<Node, RenderError>)>;

fn tag(id: usize, content: BoxFuture<'static, Result<Node, RenderError>>) -> Tagged {
    content.map(move |result| (id, result)).boxed()
}

struct StreamTask {
    tx: mpsc::Sender<Bytes>,
    observer: Arc<dyn RenderObserver>,
    error: Option<Arc<dyn Component>>,
    not_found: Option<Arc<dyn Component>>,
    loading: LoadingFallback,
    cx: RenderContext,
    next_id: usize,
    expose_errors: bool,
}

impl StreamTask {
    async fn run(mut self, head: String, pending: Vec<PendingBoundary>, tail: String) {
        self.observer.on_phase(RenderPhase::Streaming);
        if self.tx.send(Bytes::from(head)).await.is_err() {
            tracing::debug!("Client disconnected before shell was sent");
            return;
        }

        let mut inflight = FuturesUnordered::new();
        for (id, content) in pending {
            inflight.push(tag(id, content));
        }

        let mut runtime_sent = false;
        loop {
            let next = tokio::select! {
                next = inflight.next() => next,
                _ = self.tx.closed() => {
                    tracing::debug!(
                        remaining = inflight.len(),
                        "Client disconnected, abandoning deferred boundaries"
                    );
                    return;
                }
            };
            let Some((id, result)) = next else {
                break;
            };

            let (markup, nested) = match result {
                Ok(node) => self.write_boundary(node),
                Err(err) => (self.failure_markup(&err), Vec::new()),
            };
            for (nested_id, content) in nested {
                inflight.push(tag(nested_id, content));
            }

            let mut chunk = String::new();
            if !runtime_sent {
                chunk.push_str(PATCH_RUNTIME);
                runtime_sent = true;
            }
            chunk.push_str(&format!(
                "<div hidden id=\"tl-s{id}\">{markup}</div><script>$TL({id})</script>"
            ));

            if self.tx.send(Bytes::from(chunk)).await.is_err() {
                tracing::debug!(
                    remaining = inflight.len(),
                    "Client disconnected, abandoning deferred boundaries"
                );
                return;
            }
        }

        if !tail.is_empty() && self.tx.send(Bytes::from(tail)).await.is_err() {
            tracing::debug!("Client disconnected before document tail was sent");
            return;
        }
        self.observer.on_phase(RenderPhase::Complete);
    }

    fn write_boundary(&mut self, node: Node) -> (String, Vec<PendingBoundary>) {
        let mut writer = MarkupWriter::new(&mut self.next_id, &mut self.loading);
        match writer.write(node) {
            Ok(()) => (writer.out, writer.pending),
            Err(err) => {
                drop(writer);
                (self.failure_markup(&err), Vec::new())
            }
        }
    }

    /// Inline replacement for a boundary that failed after the first flush.
    fn failure_markup(&self, err: &RenderError) -> String {
        if err.is_not_found() {
            tracing::debug!("Deferred content signaled not-found after commit");
            if let Some(component) = &self.not_found {
                match component.render(&self.cx, Node::Empty) {
                    Ok(node) => return render_static(node),
                    Err(e) => tracing::warn!(error = %e, "Not-found fallback failed to render"),
                }
            }
            return document::INLINE_NOT_FOUND.to_string();
        }

        self.observer.on_error(err);

        let detail = self.expose_errors.then(|| err.to_string());
        if let Some(component) = &self.error {
            let cx = RenderContext {
                error: Some(detail.clone().unwrap_or_default()),
                ..self.cx.clone()
            };
            match component.render(&cx, Node::Empty) {
                Ok(node) => return render_static(node),
                Err(e) => tracing::warn!(error = %e, "Error fallback failed to render"),
            }
        }
        document::inline_error(detail.as_deref())
    }
}
