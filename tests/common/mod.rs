//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use treeline::client::NAVIGATION_HEADER;
use treeline::config::TreelineConfig;
use treeline::render::{ComponentRegistry, FragmentLoader, Loadable};
use treeline::routing::RouteTable;
use treeline::HttpServer;

pub const LAYOUT: &str =
    "<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head><body>{{children}}</body></html>";

pub const POST_PAGE: &str =
    "+++\ntitle = \"Post {{params.slug}}\"\ndescription = \"A post\"\n+++\n<h1>{{params.slug}}</h1>";

/// Write `files` (relative path, contents) under `root`.
pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (relative, contents) in files {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
}

/// A temporary app directory populated with `files`.
pub fn app_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    write_files(dir.path(), files);
    dir
}

/// The standard blog fixture.
pub fn blog_app() -> TempDir {
    app_dir(&[
        ("layout.html", LAYOUT),
        ("page.html", "<h1>Home</h1>"),
        ("blog/[slug]/page.html", POST_PAGE),
        ("_drafts/page.html", "<h1>Draft</h1>"),
    ])
}

pub struct TestApp {
    pub routes: Arc<RouteTable>,
    pub router: Router,
}

/// Serve `dir` with fragments only.
pub fn serve(dir: &TempDir, config: TreelineConfig) -> TestApp {
    serve_with(dir, config, Arc::new(FragmentLoader::new(false)))
}

/// Serve `dir` with code components layered over the fragment loader.
pub fn serve_registry(dir: &TempDir, config: TreelineConfig, registry: ComponentRegistry) -> TestApp {
    let registry = registry.with_fallback(Arc::new(FragmentLoader::new(false)));
    serve_with(dir, config, Arc::new(registry))
}

pub fn serve_with(dir: &TempDir, mut config: TreelineConfig, loader: Arc<dyn Loadable>) -> TestApp {
    config.routes.app_dir = dir.path().to_path_buf();
    let routes = Arc::new(RouteTable::load(dir.path(), config.build_options()).unwrap());
    let server = HttpServer::new(config, Arc::clone(&routes), loader);
    TestApp {
        routes,
        router: server.router(),
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> &str {
        self.headers
            .get(name)
            .map(|v| v.to_str().unwrap())
            .unwrap_or_default()
    }
}

async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    TestResponse {
        status,
        headers,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

/// Document request.
pub async fn get(router: &Router, path: &str) -> TestResponse {
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    send(router, request).await
}

/// Navigation (payload) request.
pub async fn navigate(router: &Router, path: &str) -> TestResponse {
    let request = Request::builder()
        .uri(path)
        .header(NAVIGATION_HEADER, "1")
        .body(Body::empty())
        .unwrap();
    send(router, request).await
}
