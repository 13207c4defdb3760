//! The client router driven against the real server over an in-process
//! transport.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use treeline::client::{
    ClientError, ClientRouter, History, NavigateOptions, NavigationOutcome, Renderer, RouteStore,
    Transport, UnitResolver, NAVIGATION_HEADER,
};
use treeline::config::TreelineConfig;
use treeline::hydration::{extract_payload, HydrationPayload};

mod common;

struct RouterTransport(Router);

impl Transport for RouterTransport {
    async fn fetch_payload(&self, href: &str) -> Result<HydrationPayload, ClientError> {
        let request = Request::builder()
            .uri(href)
            .header(NAVIGATION_HEADER, "1")
            .body(Body::empty())
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let response = self
            .0
            .clone()
            .oneshot(request)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        if status != StatusCode::OK && status != StatusCode::NOT_FOUND {
            return Err(ClientError::Transport(format!("status {status}")));
        }
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Transport(e.to_string()))
    }
}

/// Resolves ids through the served manifest.
struct ManifestResolver(BTreeMap<String, String>);

impl UnitResolver for ManifestResolver {
    type Unit = String;

    async fn resolve(&self, id: &str) -> Result<String, ClientError> {
        self.0.get(id).cloned().ok_or_else(|| ClientError::Resolve {
            id: id.to_string(),
            message: "not in manifest".into(),
        })
    }
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    fn record(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl Renderer<String> for Recorder {
    fn hydrate(&self, units: Vec<String>, _payload: &HydrationPayload) -> Result<(), ClientError> {
        self.record(format!("hydrate {}", units.join(" ")));
        Ok(())
    }

    fn render(&self, units: Vec<String>, _payload: &HydrationPayload) -> Result<(), ClientError> {
        self.record(format!("render {}", units.join(" ")));
        Ok(())
    }
}

impl History for Recorder {
    fn push(&self, href: &str) {
        self.record(format!("push {href}"));
    }

    fn replace(&self, href: &str) {
        self.record(format!("replace {href}"));
    }

    fn reload(&self, href: &str) {
        self.record(format!("reload {href}"));
    }
}

#[tokio::test]
async fn test_hydrate_then_soft_navigate() {
    let dir = common::blog_app();
    let app = common::serve(&dir, TreelineConfig::default());

    let manifest = common::get(&app.router, "/_treeline/manifest.json").await;
    let manifest: BTreeMap<String, String> = serde_json::from_str(&manifest.body).unwrap();

    let document = common::get(&app.router, "/").await;
    let initial = extract_payload(&document.body).unwrap();

    let renders = Recorder::default();
    let history = Recorder::default();
    let store = RouteStore::new();
    let client = ClientRouter::new(
        RouterTransport(app.router.clone()),
        ManifestResolver(manifest),
        renders.clone(),
        history.clone(),
        store.clone(),
    );

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let subscription = store.subscribe(move |state| sink.lock().unwrap().push(state.href.clone()));

    client.hydrate("/", initial).await.unwrap();
    assert_eq!(
        renders.entries(),
        vec!["hydrate /_treeline/static/app/layout.html /_treeline/static/app/page.html"]
    );

    let outcome = client
        .navigate("/blog/hello-world", NavigateOptions::default())
        .await;
    assert_eq!(outcome, NavigationOutcome::Rendered);
    assert_eq!(
        renders.entries().last().map(String::as_str),
        Some("render /_treeline/static/app/layout.html /_treeline/static/app/blog/[slug]/page.html")
    );
    let state = store.get().unwrap();
    assert_eq!(state.payload.params["slug"], "hello-world");

    // No not-found unit anywhere: the server answers with a bare 404, the
    // client falls back to a full load
    let outcome = client.navigate("/missing", NavigateOptions::default()).await;
    assert_eq!(outcome, NavigationOutcome::Reloaded);
    assert_eq!(
        history.entries(),
        vec!["push /blog/hello-world", "push /missing", "reload /missing"]
    );

    drop(subscription);
    client
        .navigate("/blog/other", NavigateOptions { replace: true })
        .await;
    assert_eq!(*seen.lock().unwrap(), vec!["/", "/blog/hello-world"]);
    assert_eq!(store.get().unwrap().href, "/blog/other");
}
