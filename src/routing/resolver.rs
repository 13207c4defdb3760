//! Ancestor-chain resolution.
//!
//! Walks `parent` links from a node to the root. Layouts are collected
//! root-first; fallbacks use nearest-ancestor-wins.

use crate::routing::segment::SpecialFile;
use crate::routing::tree::{NodeId, RouteFile, RouteTree};

impl RouteTree {
    /// Node ids from `node` up to and including the root.
    pub fn ancestors(&self, node: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: Some(node),
        }
    }

    /// Layouts wrapping `node`, outermost first.
    pub fn layout_chain(&self, node: NodeId) -> Vec<&RouteFile> {
        let mut chain: Vec<&RouteFile> = self
            .ancestors(node)
            .filter_map(|id| self.node(id).files.layout.as_ref())
            .collect();
        chain.reverse();
        chain
    }

    fn nearest(&self, node: NodeId, kind: SpecialFile) -> Option<(NodeId, &RouteFile)> {
        self.ancestors(node)
            .find_map(|id| self.node(id).files.get(kind).map(|file| (id, file)))
    }

    pub fn nearest_loading(&self, node: NodeId) -> Option<&RouteFile> {
        self.nearest(node, SpecialFile::Loading).map(|(_, f)| f)
    }

    pub fn nearest_error(&self, node: NodeId) -> Option<&RouteFile> {
        self.nearest(node, SpecialFile::Error).map(|(_, f)| f)
    }

    /// Nearest not-found file and the node that declares it.
    pub fn nearest_not_found(&self, node: NodeId) -> Option<(NodeId, &RouteFile)> {
        self.nearest(node, SpecialFile::NotFound)
    }

    pub fn root_not_found(&self) -> Option<&RouteFile> {
        self.root().files.not_found.as_ref()
    }

    pub fn root_layout(&self) -> Option<&RouteFile> {
        self.root().files.layout.as_ref()
    }
}

/// Iterator over a node and its ancestors, nearest first.
#[derive(Debug)]
pub struct Ancestors<'a> {
    tree: &'a RouteTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.node(current).parent;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use crate::routing::builder::BuildOptions;
    use crate::routing::tree::RouteTree;
    use std::fs;
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

    #[test]
    fn test_layout_chain_is_root_first() {
        let (_dir, tree) = tree_with(&[
            "layout.html",
            "a/layout.html",
            "a/b/layout.html",
            "a/b/page.html",
        ]);
        let m = tree.match_path("/a/b").unwrap();
        let chain: Vec<&str> = tree
            .layout_chain(m.node)
            .iter()
            .map(|f| f.relative.as_str())
            .collect();
        assert_eq!(chain, vec!["layout.html", "a/layout.html", "a/b/layout.html"]);
    }

    #[test]
    fn test_layout_chain_skips_nodes_without_layout() {
        let (_dir, tree) = tree_with(&["layout.html", "a/b/layout.html", "a/b/c/page.html"]);
        let m = tree.match_path("/a/b/c").unwrap();
        let chain: Vec<&str> = tree
            .layout_chain(m.node)
            .iter()
            .map(|f| f.relative.as_str())
            .collect();
        assert_eq!(chain, vec!["layout.html", "a/b/layout.html"]);
    }

    #[test]
    fn test_nearest_fallbacks_shadow_ancestors() {
        let (_dir, tree) = tree_with(&[
            "loading.html",
            "error.html",
            "not-found.html",
            "shop/loading.html",
            "shop/item/page.html",
        ]);
        let m = tree.match_path("/shop/item").unwrap();
        assert_eq!(
            tree.nearest_loading(m.node).unwrap().relative,
            "shop/loading.html"
        );
        assert_eq!(tree.nearest_error(m.node).unwrap().relative, "error.html");
        let (owner, nf) = tree.nearest_not_found(m.node).unwrap();
        assert_eq!(nf.relative, "not-found.html");
        assert_eq!(tree.pattern(owner), "/");
        assert_eq!(tree.root_not_found().unwrap().relative, "not-found.html");
        assert!(tree.root_layout().is_none());
    }
}
