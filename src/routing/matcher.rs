//! Route matching logic.
//!
//! # Responsibilities
//! - Normalize the request path
//! - Walk the route tree one segment at a time
//! - Bind dynamic and catch-all parameters
//!
//! # Design Decisions
//! - Precedence is fixed: static > dynamic > catch-all
//! - A catch-all consumes every remaining segment and stops the walk
//! - No backtracking: a dead end after choosing a slot is a miss
//! - A match requires a page on the final node
//! - Path matching is case-sensitive
//! - Segments are percent-decoded before any comparison

use std::borrow::Cow;
use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;

use crate::routing::tree::{NodeId, RouteFile, RouteTree};

/// Route parameters by name.
pub type Params = BTreeMap<String, String>;

/// Result of a successful match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub node: NodeId,
    pub params: Params,
    pub page: RouteFile,
}

/// Collapse repeated separators and strip the trailing one (except for `/`).
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    let clean = path.starts_with('/')
        && !path.contains("//")
        && (path == "/" || !path.ends_with('/'));
    if clean {
        return Cow::Borrowed(path);
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    Cow::Owned(format!("/{}", segments.join("/")))
}

fn decode(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

/// Outcome of walking the tree, shared by matching and not-found resolution.
struct Walk {
    node: NodeId,
    params: Params,
    complete: bool,
}

impl RouteTree {
    fn walk(&self, pathname: &str) -> Walk {
        let normalized = normalize_path(pathname);
        // Decoded once so static names and captures compare the same text
        let segments: Vec<String> = normalized
            .split('/')
            .filter(|s| !s.is_empty())
            .map(decode)
            .collect();

        let mut current = NodeId::ROOT;
        let mut params = Params::new();
        let mut index = 0;

        while index < segments.len() {
            let segment = segments[index].as_str();
            let node = self.node(current);

            // 1. Static
            if let Some(&child) = node.children.get(segment) {
                current = child;
                index += 1;
                continue;
            }

            // 2. Dynamic
            if let Some(child) = node.dynamic_child {
                if let Some(name) = self.node(child).kind.param_name() {
                    params.insert(name.to_string(), segment.to_string());
                }
                current = child;
                index += 1;
                continue;
            }

            // 3. Catch-all (terminal)
            if let Some(child) = node.catch_all_child {
                if let Some(name) = self.node(child).kind.param_name() {
                    params.insert(name.to_string(), segments[index..].join("/"));
                }
                return Walk {
                    node: child,
                    params,
                    complete: true,
                };
            }

            // 4. Dead end
            return Walk {
                node: current,
                params,
                complete: false,
            };
        }

        Walk {
            node: current,
            params,
            complete: true,
        }
    }

    /// Match a request path. Returns `None` when no route applies.
    pub fn match_path(&self, pathname: &str) -> Option<RouteMatch> {
        let walk = self.walk(pathname);
        if !walk.complete {
            return None;
        }
        let page = self.node(walk.node).files.page.clone()?;
        Some(RouteMatch {
            node: walk.node,
            params: walk.params,
            page,
        })
    }

    /// Deepest node reached while walking `pathname`, matched or not.
    pub fn deepest_node(&self, pathname: &str) -> NodeId {
        self.walk(pathname).node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::builder::BuildOptions;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn tree_with(files: &[&str]) -> (TempDir, RouteTree) {
        let dir = TempDir::new().unwrap();
        for relative in files {
            let path = dir.path().join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
        let tree = RouteTree::build(dir.path(), &BuildOptions::default()).unwrap();
        (dir, tree)
    }

    fn pattern(tree: &RouteTree, path: &str) -> Option<String> {
        tree.match_path(path).map(|m| tree.pattern(m.node))
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/blog/"), "/blog");
        assert_eq!(normalize_path("//blog///post//"), "/blog/post");
        assert_eq!(normalize_path("blog"), "/blog");
        assert!(matches!(normalize_path("/a/b"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_root_match_has_empty_params() {
        let (_dir, tree) = tree_with(&["page.html"]);
        let m = tree.match_path("/").unwrap();
        assert_eq!(m.node, NodeId::ROOT);
        assert!(m.params.is_empty());
    }

    #[test]
    fn test_static_beats_dynamic_and_catch_all() {
        let (_dir, tree) = tree_with(&[
            "blog/new/page.html",
            "blog/[slug]/page.html",
            "docs/intro/page.html",
            "docs/[...rest]/page.html",
        ]);

        assert_eq!(pattern(&tree, "/blog/new").as_deref(), Some("/blog/new"));
        assert_eq!(pattern(&tree, "/blog/other").as_deref(), Some("/blog/[slug]"));
        assert_eq!(pattern(&tree, "/docs/intro").as_deref(), Some("/docs/intro"));
        assert_eq!(
            pattern(&tree, "/docs/intro/more").as_deref(),
            None,
            "static child chosen, no backtracking into catch-all"
        );
        assert_eq!(pattern(&tree, "/docs/other").as_deref(), Some("/docs/[...rest]"));
    }

    #[test]
    fn test_encoded_static_segment_beats_dynamic() {
        let (_dir, tree) = tree_with(&[
            "about us/page.html",
            "café/page.html",
            "[slug]/page.html",
        ]);

        let m = tree.match_path("/about%20us").unwrap();
        assert_eq!(tree.pattern(m.node), "/about us");
        assert!(m.params.is_empty());
        assert_eq!(pattern(&tree, "/caf%C3%A9").as_deref(), Some("/café"));
        assert_eq!(pattern(&tree, "/about%20them").as_deref(), Some("/[slug]"));
    }

    #[test]
    fn test_dynamic_beats_catch_all() {
        let (_dir, tree) = tree_with(&["a/[id]/page.html", "a/[...rest]/page.html"]);
        let m = tree.match_path("/a/one").unwrap();
        assert_eq!(m.params.get("id").map(String::as_str), Some("one"));
        assert!(tree.match_path("/a/one/two").is_none());
    }

    #[test]
    fn test_catch_all_captures_remainder() {
        let (_dir, tree) = tree_with(&["a/[...rest]/page.html"]);
        let m = tree.match_path("/a/b/c").unwrap();
        assert_eq!(m.params.get("rest").map(String::as_str), Some("b/c"));
        assert!(tree.match_path("/a").is_none(), "no page at /a");
    }

    #[test]
    fn test_dynamic_params_nested_and_decoded() {
        let (_dir, tree) = tree_with(&["users/[user]/posts/[post]/page.html"]);
        let m = tree.match_path("/users/ada%20l/posts/42/").unwrap();
        assert_eq!(m.params.get("user").map(String::as_str), Some("ada l"));
        assert_eq!(m.params.get("post").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_intermediate_node_without_page_is_no_match() {
        let (_dir, tree) = tree_with(&["layout.html", "shop/layout.html", "shop/cart/page.html"]);
        assert!(tree.match_path("/shop").is_none());
        assert!(tree.match_path("/").is_none());
        assert!(tree.match_path("/shop/cart").is_some());
    }

    #[test]
    fn test_case_sensitive() {
        let (_dir, tree) = tree_with(&["About/page.html"]);
        assert!(tree.match_path("/About").is_some());
        assert!(tree.match_path("/about").is_none());
    }

    #[test]
    fn test_deepest_node_for_unmatched_path() {
        let (_dir, tree) = tree_with(&["shop/page.html", "shop/not-found.html"]);
        let deepest = tree.deepest_node("/shop/missing/item");
        assert_eq!(tree.pattern(deepest), "/shop");
        assert!(Path::new(&tree.node(deepest).files.not_found.as_ref().unwrap().relative)
            .ends_with("not-found.html"));
    }
}
