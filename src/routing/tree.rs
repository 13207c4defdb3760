//! Route tree data model.
//!
//! # Responsibilities
//! - Own every route node in a single arena
//! - Provide non-owning upward links (`parent`) for ancestor walks
//! - Expose per-node special files and child slots
//!
//! # Design Decisions
//! - Nodes are stored in a `Vec` and addressed by `NodeId`; the parent link is
//!   a plain index, so there is no shared ownership and no cycles
//! - The tree is immutable once built; rebuilds produce a new tree

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::routing::segment::{SegmentKind, SpecialFile};

/// Index of a node inside its `RouteTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The root node of every tree.
    pub const ROOT: NodeId = NodeId(0);
}

/// How client-loadable unit identifiers are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitIdMode {
    /// The relative path itself (readable, development only).
    #[default]
    Path,
    /// A short content-independent digest of the relative path.
    Hashed,
}

/// A recognized special file attached to a route node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteFile {
    pub kind: SpecialFile,
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Path relative to the app directory, `/`-separated.
    pub relative: String,
    /// Opaque identifier the client uses to load this unit.
    pub id: String,
}

impl RouteFile {
    pub fn new(kind: SpecialFile, path: PathBuf, relative: String, mode: UnitIdMode) -> Self {
        let id = unit_id(&relative, mode);
        Self {
            kind,
            path,
            relative,
            id,
        }
    }
}

/// Derive the client identifier for a relative unit path.
pub fn unit_id(relative: &str, mode: UnitIdMode) -> String {
    match mode {
        UnitIdMode::Path => relative.to_string(),
        UnitIdMode::Hashed => {
            let digest = Sha256::digest(relative.as_bytes());
            hex::encode(&digest[..6])
        }
    }
}

/// Optional special files declared by one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecialFiles {
    pub page: Option<RouteFile>,
    pub layout: Option<RouteFile>,
    pub loading: Option<RouteFile>,
    pub error: Option<RouteFile>,
    pub not_found: Option<RouteFile>,
}

impl SpecialFiles {
    pub fn get(&self, kind: SpecialFile) -> Option<&RouteFile> {
        match kind {
            SpecialFile::Page => self.page.as_ref(),
            SpecialFile::Layout => self.layout.as_ref(),
            SpecialFile::Loading => self.loading.as_ref(),
            SpecialFile::Error => self.error.as_ref(),
            SpecialFile::NotFound => self.not_found.as_ref(),
        }
    }

    pub(crate) fn slot_mut(&mut self, kind: SpecialFile) -> &mut Option<RouteFile> {
        match kind {
            SpecialFile::Page => &mut self.page,
            SpecialFile::Layout => &mut self.layout,
            SpecialFile::Loading => &mut self.loading,
            SpecialFile::Error => &mut self.error,
            SpecialFile::NotFound => &mut self.not_found,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteFile> {
        SpecialFile::ALL.into_iter().filter_map(|kind| self.get(kind))
    }
}

/// One filesystem segment of the route tree.
#[derive(Debug, Clone)]
pub struct RouteNode {
    /// Raw directory name (`blog`, `[slug]`, `[...rest]`); empty for the root.
    pub segment: String,
    pub kind: SegmentKind,
    pub files: SpecialFiles,
    /// Static children by literal name.
    pub children: HashMap<String, NodeId>,
    pub dynamic_child: Option<NodeId>,
    pub catch_all_child: Option<NodeId>,
    /// Lookup-only link towards the root.
    pub parent: Option<NodeId>,
}

impl RouteNode {
    pub(crate) fn new(segment: String, kind: SegmentKind, parent: Option<NodeId>) -> Self {
        Self {
            segment,
            kind,
            files: SpecialFiles::default(),
            children: HashMap::new(),
            dynamic_child: None,
            catch_all_child: None,
            parent,
        }
    }

    pub fn has_page(&self) -> bool {
        self.files.page.is_some()
    }
}

/// The immutable route tree produced by a build pass.
#[derive(Debug, Clone)]
pub struct RouteTree {
    pub(crate) nodes: Vec<RouteNode>,
    pub(crate) app_dir: PathBuf,
}

impl RouteTree {
    /// A tree with only an empty root, used before the first build.
    pub fn empty(app_dir: impl Into<PathBuf>) -> Self {
        Self {
            nodes: vec![RouteNode::new(String::new(), SegmentKind::Static, None)],
            app_dir: app_dir.into(),
        }
    }

    pub fn root(&self) -> &RouteNode {
        &self.nodes[NodeId::ROOT.0]
    }

    pub fn node(&self, id: NodeId) -> &RouteNode {
        &self.nodes[id.0]
    }

    pub fn app_dir(&self) -> &std::path::Path {
        &self.app_dir
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1 && !self.root().has_page()
    }

    /// Iterate `(NodeId, &RouteNode)` pairs in build order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &RouteNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Every unit file in the tree.
    pub fn files(&self) -> impl Iterator<Item = &RouteFile> {
        self.nodes.iter().flat_map(|n| n.files.iter())
    }

    /// URL pattern of a node, e.g. `/blog/[slug]`.
    pub fn pattern(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if node.parent.is_some() {
                segments.push(node.segment.as_str());
            }
            current = node.parent;
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    /// Patterns of every node that has a page, sorted.
    pub fn routes(&self) -> Vec<String> {
        let mut routes: Vec<String> = self
            .iter()
            .filter(|(_, node)| node.has_page())
            .map(|(id, _)| self.pattern(id))
            .collect();
        routes.sort();
        routes
    }
}
