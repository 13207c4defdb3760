//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, response headers)
//! - Document requests: match, compose, render, inject, stream
//! - Navigation requests: the same resolution, answered with a JSON payload
//! - Serve the unit manifest and static client assets
//! - Observability (metrics, request-scoped spans)
//!
//! # Status mapping
//! ```text
//! no match / NotFound signal in shell  → 404 (nearest not-found, else generic)
//! load or shell render failure         → 500 (nearest error fallback, else generic)
//! failure after first byte             → status already sent, inline fallback
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    services::ServeDir, set_header::SetResponseHeaderLayer, timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::client::NAVIGATION_HEADER;
use crate::config::TreelineConfig;
use crate::http::request::{
    drop_malformed_request_id, is_navigation, page_props, propagate_request_id_layer,
    set_request_id_layer,
};
use crate::http::response;
use crate::hydration::{manifest, HydrationPayload};
use crate::observability::metrics::{self, RequestKind};
use crate::observability::tracing::RequestSpan;
use crate::render::{
    document, render, render_static, HtmlInjector, Injected, LoadedComposition, Loadable, Node,
    RenderComposition, RenderContext, RenderError, RenderObserver, RenderOptions, RenderPhase,
    ShellFailure,
};
use crate::routing::{NodeId, Params, RouteTable, RouteTree};

pub const MANIFEST_PATH: &str = "/_treeline/manifest.json";
pub const STATIC_PREFIX: &str = "/_treeline/static";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub loader: Arc<dyn Loadable>,
    pub config: Arc<TreelineConfig>,
    pub render: RenderOptions,
}

/// HTTP server for the framework.
pub struct HttpServer {
    router: Router,
    config: Arc<TreelineConfig>,
}

impl HttpServer {
    pub fn new(config: TreelineConfig, routes: Arc<RouteTable>, loader: Arc<dyn Loadable>) -> Self {
        let config = Arc::new(config);
        let state = AppState {
            routes,
            loader,
            render: RenderOptions {
                expose_errors: !config.is_production(),
                ..RenderOptions::default()
            },
            config: Arc::clone(&config),
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &TreelineConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route(MANIFEST_PATH, get(manifest_handler))
            .route("/", get(page_handler))
            .route("/{*path}", get(page_handler));

        if let Some(public_dir) = &config.render.public_dir {
            router = router.nest_service(STATIC_PREFIX, ServeDir::new(public_dir));
        }

        router
            .with_state(state)
            .layer(SetResponseHeaderLayer::if_not_present(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::appending(
                header::VARY,
                HeaderValue::from_static(NAVIGATION_HEADER),
            ))
            .layer(TimeoutLayer::new(config.server.request_timeout()))
            .layer(TraceLayer::new_for_http().make_span_with(RequestSpan))
            .layer(
                ServiceBuilder::new()
                    .layer(axum::middleware::map_request(drop_malformed_request_id))
                    .layer(set_request_id_layer())
                    .layer(propagate_request_id_layer()),
            )
    }

    /// The fully layered router, for in-process serving.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` resolves, then drain in-flight responses.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mode = ?self.config.render.mode,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &TreelineConfig {
        &self.config
    }
}

async fn manifest_handler(State(state): State<AppState>) -> Response {
    let start = Instant::now();
    let tree = state.routes.current();
    let body = manifest(&tree, &state.config.render.asset_prefix);
    metrics::record_request("GET", 200, RequestKind::Manifest, start);
    Json(body).into_response()
}

/// Document and navigation requests for every route path.
async fn page_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let navigation = is_navigation(request.headers());
    let page = PageRequest {
        pathname: request.uri().path().to_string(),
        query: request.uri().query().map(str::to_string),
    };

    tracing::debug!(path = %page.pathname, navigation, "Serving page request");

    let tree = state.routes.current();
    let (response, kind) = if navigation {
        (serve_navigation(&state, &tree, &page), RequestKind::Navigation)
    } else {
        (serve_document(&state, &tree, &page), RequestKind::Document)
    };

    metrics::record_request(&method, response.status().as_u16(), kind, start);
    response
}

struct PageRequest {
    pathname: String,
    query: Option<String>,
}

impl PageRequest {
    fn context(&self, params: &Params) -> RenderContext {
        RenderContext {
            pathname: self.pathname.clone(),
            params: params.clone(),
            props: page_props(params, self.query.as_deref()),
            error: None,
        }
    }
}

/// A composition with its units loaded and its payload assembled.
struct Prepared {
    loaded: LoadedComposition,
    cx: RenderContext,
    payload: HydrationPayload,
    head: String,
}

fn prepare(
    state: &AppState,
    composition: &RenderComposition,
    page: &PageRequest,
    params: &Params,
) -> Result<Prepared, ShellFailure> {
    let loaded = LoadedComposition::load(composition, state.loader.as_ref()).map_err(|e| {
        metrics::record_render_error("load");
        tracing::error!(error = %e, "Failed to load route units");
        ShellFailure::from(e)
    })?;
    let cx = page.context(params);
    let metadata = loaded.metadata(params);
    let head = document::head_block(&metadata, state.config.render.client_entry.as_deref());
    let payload =
        HydrationPayload::from_composition(composition, cx.props.clone(), params.clone(), metadata);
    Ok(Prepared {
        loaded,
        cx,
        payload,
        head,
    })
}

fn render_document(
    state: &AppState,
    composition: &RenderComposition,
    page: &PageRequest,
    params: &Params,
    status: StatusCode,
) -> Result<Response, ShellFailure> {
    let prepared = prepare(state, composition, page, params)?;
    let payload_block = document::payload_block(&prepared.payload)
        .map_err(|e| ShellFailure::Error(RenderError::component(e.to_string())))?;

    let observer = Arc::new(TracingObserver {
        pathname: page.pathname.clone(),
    });
    let stream = render(prepared.loaded, prepared.cx, observer, &state.render)?;
    let injector = HtmlInjector::new(prepared.head, payload_block);
    Ok(response::html_stream(status, Injected::new(stream, injector)))
}

fn serve_document(state: &AppState, tree: &RouteTree, page: &PageRequest) -> Response {
    let Some(matched) = tree.match_path(&page.pathname) else {
        return not_found_document(state, tree, tree.deepest_node(&page.pathname), page);
    };

    let composition = RenderComposition::for_match(tree, &matched);
    match render_document(state, &composition, page, &matched.params, StatusCode::OK) {
        Ok(response) => response,
        Err(ShellFailure::NotFound) => not_found_document(state, tree, matched.node, page),
        Err(ShellFailure::Error(e)) => error_document(state, tree, matched.node, page, &e),
    }
}

fn not_found_document(
    state: &AppState,
    tree: &RouteTree,
    from: NodeId,
    page: &PageRequest,
) -> Response {
    if let Some(composition) = RenderComposition::for_not_found(tree, from) {
        match render_document(state, &composition, page, &Params::new(), StatusCode::NOT_FOUND) {
            Ok(response) => return response,
            Err(e) => tracing::warn!(error = %e, "Not-found page failed, using built-in 404"),
        }
    }
    response::html(StatusCode::NOT_FOUND, document::generic_not_found())
}

/// 500 page: the nearest error fallback rendered on its own, else the
/// built-in page. Details only in the development posture.
fn error_document(
    state: &AppState,
    tree: &RouteTree,
    node: NodeId,
    page: &PageRequest,
    error: &RenderError,
) -> Response {
    let detail = state.render.expose_errors.then(|| error.to_string());

    let fallback = tree.nearest_error(node).and_then(|unit| {
        let component = state.loader.resolve(unit).ok()?;
        let cx = RenderContext {
            error: Some(detail.clone().unwrap_or_default()),
            ..page.context(&Params::new())
        };
        match component.render(&cx, Node::Empty) {
            Ok(node) => Some(render_static(node)),
            Err(e) => {
                tracing::warn!(error = %e, "Error fallback failed to render");
                None
            }
        }
    });

    let markup = match fallback {
        Some(markup) if markup.to_ascii_lowercase().contains("<html") => markup,
        Some(markup) => document::default_document(&markup),
        None => document::generic_error(detail.as_deref()),
    };
    response::html(StatusCode::INTERNAL_SERVER_ERROR, markup)
}

fn serve_navigation(state: &AppState, tree: &RouteTree, page: &PageRequest) -> Response {
    let Some(matched) = tree.match_path(&page.pathname) else {
        return not_found_payload(state, tree, tree.deepest_node(&page.pathname), page);
    };

    let composition = RenderComposition::for_match(tree, &matched);
    match render_payload(state, &composition, page, &matched.params) {
        Ok(payload) => response::payload(StatusCode::OK, payload),
        Err(ShellFailure::NotFound) => not_found_payload(state, tree, matched.node, page),
        Err(ShellFailure::Error(e)) => {
            let message = if state.render.expose_errors {
                e.to_string()
            } else {
                "Internal Server Error".to_string()
            };
            response::json_error(StatusCode::INTERNAL_SERVER_ERROR, &message)
        }
    }
}

/// The payload for a navigation. The shell is still rendered so a page can
/// raise not-found or fail exactly as it would for a document request; the
/// stream itself is dropped.
fn render_payload(
    state: &AppState,
    composition: &RenderComposition,
    page: &PageRequest,
    params: &Params,
) -> Result<HydrationPayload, ShellFailure> {
    let prepared = prepare(state, composition, page, params)?;
    let observer = Arc::new(TracingObserver {
        pathname: page.pathname.clone(),
    });
    drop(render(prepared.loaded, prepared.cx, observer, &state.render)?);
    Ok(prepared.payload)
}

fn not_found_payload(
    state: &AppState,
    tree: &RouteTree,
    from: NodeId,
    page: &PageRequest,
) -> Response {
    if let Some(composition) = RenderComposition::for_not_found(tree, from) {
        match render_payload(state, &composition, page, &Params::new()) {
            Ok(payload) => return response::payload(StatusCode::NOT_FOUND, payload),
            Err(e) => tracing::warn!(error = %e, "Not-found page failed"),
        }
    }
    response::json_error(StatusCode::NOT_FOUND, "not found")
}

/// Logs render lifecycle events inside the request span.
struct TracingObserver {
    pathname: String,
}

impl RenderObserver for TracingObserver {
    fn on_phase(&self, phase: RenderPhase) {
        tracing::trace!(path = %self.pathname, ?phase, "Render phase");
    }

    fn on_shell_ready(&self) {
        tracing::debug!(path = %self.pathname, "Shell ready, streaming");
    }

    fn on_shell_error(&self, error: &ShellFailure) {
        match error {
            ShellFailure::NotFound => {
                tracing::debug!(path = %self.pathname, "Page signaled not-found")
            }
            ShellFailure::Error(e) => {
                metrics::record_render_error("shell");
                tracing::error!(path = %self.pathname, error = %e, "Shell render failed");
            }
        }
    }

    fn on_error(&self, error: &RenderError) {
        metrics::record_render_error("deferred");
        tracing::error!(path = %self.pathname, error = %error, "Deferred boundary failed after commit");
    }
}
