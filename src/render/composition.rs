//! Expansion of a route match into the units rendered for it.

use crate::routing::{NodeId, RouteFile, RouteMatch, RouteTree};

/// Layouts (outermost first) around one page, with the applicable fallbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderComposition {
    pub layouts: Vec<RouteFile>,
    pub page: RouteFile,
    pub loading: Option<RouteFile>,
    pub error: Option<RouteFile>,
    /// Rendered inline when deferred content signals not-found after commit.
    pub not_found: Option<RouteFile>,
}

impl RenderComposition {
    pub fn for_match(tree: &RouteTree, matched: &RouteMatch) -> Self {
        Self {
            layouts: tree.layout_chain(matched.node).into_iter().cloned().collect(),
            page: matched.page.clone(),
            loading: tree.nearest_loading(matched.node).cloned(),
            error: tree.nearest_error(matched.node).cloned(),
            not_found: tree.nearest_not_found(matched.node).map(|(_, file)| file.clone()),
        }
    }

    /// The nearest not-found unit at or above `from`, wrapped in the layouts
    /// of the directory that declares it. `None` when the tree has no
    /// not-found file on that path.
    pub fn for_not_found(tree: &RouteTree, from: NodeId) -> Option<Self> {
        let (owner, not_found) = tree.nearest_not_found(from)?;
        Some(Self {
            layouts: tree.layout_chain(owner).into_iter().cloned().collect(),
            page: not_found.clone(),
            loading: None,
            error: tree.nearest_error(owner).cloned(),
            not_found: None,
        })
    }
}
