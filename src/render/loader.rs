//! Unit loading.
//!
//! # Responsibilities
//! - Resolve a route file into a renderable component (`Loadable`)
//! - Serve components registered in code (`ComponentRegistry`)
//! - Load HTML fragment files from the app directory (`FragmentLoader`)
//!
//! # Fragment format
//! ```text
//! +++
//! title = "Post {{params.slug}}"
//! description = "..."
//! +++
//! <article><h1>{{params.slug}}</h1>{{children}}</article>
//! ```
//! - Front matter is optional TOML between `+++` lines
//! - `{{children}}` marks where a layout places its subtree; a layout without
//!   the slot gets its children appended
//! - `{{params.NAME}}` is replaced by the escaped route parameter
//! - `{{error}}` is replaced by the escaped error detail in error fallbacks

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::render::component::{Component, Metadata, RenderContext};
use crate::render::error::{LoadError, RenderError};
use crate::render::node::Node;
use crate::routing::{Params, RouteFile};

/// Capability that turns a route file into a component.
pub trait Loadable: Send + Sync {
    fn resolve(&self, unit: &RouteFile) -> Result<Arc<dyn Component>, LoadError>;
}

/// Components registered in code, keyed by relative unit path
/// (`blog/[slug]/page.html`), with an optional fallback loader.
#[derive(Default)]
pub struct ComponentRegistry {
    components: HashMap<String, Arc<dyn Component>>,
    fallback: Option<Arc<dyn Loadable>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delegate unregistered units to `loader`.
    pub fn with_fallback(mut self, loader: Arc<dyn Loadable>) -> Self {
        self.fallback = Some(loader);
        self
    }

    pub fn register(&mut self, relative: impl Into<String>, component: impl Component + 'static) {
        self.components.insert(relative.into(), Arc::new(component));
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.components.keys().collect();
        keys.sort();
        f.debug_struct("ComponentRegistry")
            .field("components", &keys)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl Loadable for ComponentRegistry {
    fn resolve(&self, unit: &RouteFile) -> Result<Arc<dyn Component>, LoadError> {
        if let Some(component) = self.components.get(&unit.relative) {
            return Ok(Arc::clone(component));
        }
        match &self.fallback {
            Some(loader) => loader.resolve(unit),
            None => Err(LoadError::Unregistered(unit.relative.clone())),
        }
    }
}

/// Loads HTML fragment files, optionally caching parsed fragments.
#[derive(Debug, Default)]
pub struct FragmentLoader {
    cache: Option<RwLock<HashMap<PathBuf, Arc<Fragment>>>>,
}

impl FragmentLoader {
    /// `cache = false` re-reads files on every request (development).
    pub fn new(cache: bool) -> Self {
        Self {
            cache: cache.then(|| RwLock::new(HashMap::new())),
        }
    }

    fn load(&self, path: &Path) -> Result<Arc<Fragment>, LoadError> {
        if let Some(cache) = &self.cache {
            let guard = cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(fragment) = guard.get(path) {
                return Ok(Arc::clone(fragment));
            }
        }

        let source = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let fragment = Arc::new(Fragment::parse(&source).map_err(|message| {
            LoadError::Invalid {
                path: path.to_path_buf(),
                message,
            }
        })?);

        if let Some(cache) = &self.cache {
            let mut guard = cache.write().unwrap_or_else(|e| e.into_inner());
            guard.insert(path.to_path_buf(), Arc::clone(&fragment));
        }
        Ok(fragment)
    }
}

impl Loadable for FragmentLoader {
    fn resolve(&self, unit: &RouteFile) -> Result<Arc<dyn Component>, LoadError> {
        let component: Arc<dyn Component> = self.load(&unit.path)?;
        Ok(component)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Raw(String),
    Children,
    Param(String),
    Error,
}

/// A parsed fragment file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    metadata: Metadata,
    pieces: Vec<Piece>,
}

impl Fragment {
    pub fn parse(source: &str) -> Result<Self, String> {
        let (metadata, body) = split_front_matter(source)?;
        Ok(Self {
            metadata,
            pieces: tokenize(body),
        })
    }
}

fn split_front_matter(source: &str) -> Result<(Metadata, &str), String> {
    let Some(rest) = source
        .strip_prefix("+++\n")
        .or_else(|| source.strip_prefix("+++\r\n"))
    else {
        return Ok((Metadata::default(), source));
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "+++" {
            let front = &rest[..offset];
            let body = &rest[offset + line.len()..];
            let metadata: Metadata =
                toml::from_str(front).map_err(|e| format!("front matter: {}", e))?;
            return Ok((metadata, body));
        }
        offset += line.len();
    }
    Err("unterminated front matter (missing closing +++)".to_string())
}

fn tokenize(body: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut rest = body;

    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        let token = rest[start + 2..start + 2 + len].trim();
        let piece = if token == "children" {
            Some(Piece::Children)
        } else if token == "error" {
            Some(Piece::Error)
        } else {
            token
                .strip_prefix("params.")
                .map(|name| Piece::Param(name.to_string()))
        };

        match piece {
            Some(piece) => {
                if start > 0 {
                    pieces.push(Piece::Raw(rest[..start].to_string()));
                }
                pieces.push(piece);
            }
            // Unknown tokens are kept verbatim
            None => pieces.push(Piece::Raw(rest[..start + 4 + len].to_string())),
        }
        rest = &rest[start + 4 + len..];
    }
    if !rest.is_empty() {
        pieces.push(Piece::Raw(rest.to_string()));
    }
    pieces
}

fn interpolate(value: &str, params: &Params) -> String {
    tokenize(value)
        .into_iter()
        .map(|piece| match piece {
            Piece::Raw(raw) => raw,
            Piece::Param(name) => params.get(&name).cloned().unwrap_or_default(),
            Piece::Children | Piece::Error => String::new(),
        })
        .collect()
}

impl Component for Fragment {
    fn render(&self, cx: &RenderContext, children: Node) -> Result<Node, RenderError> {
        let mut children = Some(children);
        let mut nodes = Vec::with_capacity(self.pieces.len() + 1);
        for piece in &self.pieces {
            match piece {
                Piece::Raw(raw) => nodes.push(Node::Raw(raw.clone())),
                Piece::Param(name) => nodes.push(Node::Text(
                    cx.param(name).unwrap_or_default().to_string(),
                )),
                Piece::Children => {
                    if let Some(children) = children.take() {
                        nodes.push(children);
                    }
                }
                Piece::Error => nodes.push(Node::Text(cx.error.clone().unwrap_or_default())),
            }
        }
        if let Some(children) = children {
            nodes.push(children);
        }
        Ok(Node::List(nodes))
    }

    fn metadata(&self, params: &Params) -> Option<Metadata> {
        if self.metadata.is_empty() {
            return None;
        }
        Some(Metadata {
            title: self.metadata.title.as_deref().map(|v| interpolate(v, params)),
            description: self
                .metadata
                .description
                .as_deref()
                .map(|v| interpolate(v, params)),
            image: self.metadata.image.as_deref().map(|v| interpolate(v, params)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::tree::UnitIdMode;
    use crate::routing::SpecialFile;
    use tempfile::TempDir;

    #[test]
    fn test_parse_front_matter_and_tokens() {
        let fragment = Fragment::parse(
            "+++\ntitle = \"Post {{params.slug}}\"\n+++\n<h1>{{ params.slug }}</h1>{{children}}{{other}}",
        )
        .unwrap();
        assert_eq!(
            fragment.pieces,
            vec![
                Piece::Raw("<h1>".into()),
                Piece::Param("slug".into()),
                Piece::Raw("</h1>".into()),
                Piece::Children,
                Piece::Raw("{{other}}".into()),
            ]
        );

        let mut params = Params::new();
        params.insert("slug".into(), "hello".into());
        let meta = fragment.metadata(&params).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Post hello"));
        assert!(meta.description.is_none());
    }

    #[test]
    fn test_error_token_renders_detail() {
        let fragment = Fragment::parse("<p>Failed: {{error}}</p>").unwrap();
        let cx = RenderContext {
            error: Some("a < b".into()),
            ..RenderContext::default()
        };
        let node = fragment.render(&cx, Node::Empty).unwrap();
        assert_eq!(
            crate::render::pipeline::render_static(node),
            "<p>Failed: a &lt; b</p>"
        );
    }

    #[test]
    fn test_layout_without_slot_appends_children() {
        let fragment = Fragment::parse("<header>site</header>").unwrap();
        let node = fragment
            .render(&RenderContext::default(), Node::raw("<p>page</p>"))
            .unwrap();
        assert_eq!(
            crate::render::pipeline::render_static(node),
            "<header>site</header><p>page</p>"
        );
    }

    #[test]
    fn test_fragment_without_front_matter_has_no_metadata() {
        let fragment = Fragment::parse("<p>plain</p>").unwrap();
        assert!(fragment.metadata(&Params::new()).is_none());
    }

    #[test]
    fn test_unterminated_front_matter_is_invalid() {
        assert!(Fragment::parse("+++\ntitle = \"x\"\n<p>").is_err());
    }

    #[test]
    fn test_registry_prefers_registered_then_fallback() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<p>from disk</p>").unwrap();
        let unit = RouteFile::new(SpecialFile::Page, path, "page.html".into(), UnitIdMode::Path);

        let bare = ComponentRegistry::new();
        assert!(matches!(
            bare.resolve(&unit),
            Err(LoadError::Unregistered(ref r)) if r == "page.html"
        ));

        let registry = ComponentRegistry::new().with_fallback(Arc::new(FragmentLoader::new(true)));
        assert!(registry.resolve(&unit).is_ok());
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let unit = RouteFile::new(
            SpecialFile::Page,
            PathBuf::from("/definitely/not/here/page.html"),
            "page.html".into(),
            UnitIdMode::Path,
        );
        assert!(matches!(
            FragmentLoader::new(false).resolve(&unit),
            Err(LoadError::Io { .. })
        ));
    }
}
