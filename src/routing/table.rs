//! Shared, atomically replaceable route tree.
//!
//! Requests take one snapshot (`current`) and keep using it for their whole
//! lifetime, so a rebuild never affects an in-flight match.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::observability::metrics;
use crate::routing::builder::{BuildError, BuildOptions};
use crate::routing::tree::RouteTree;

#[derive(Debug)]
pub struct RouteTable {
    current: ArcSwap<RouteTree>,
    app_dir: PathBuf,
    options: BuildOptions,
}

impl RouteTable {
    /// Build the initial tree. Fails if the app directory cannot be read.
    pub fn load(app_dir: &Path, options: BuildOptions) -> Result<Self, BuildError> {
        let tree = RouteTree::build(app_dir, &options)?;
        metrics::record_route_build(tree.len(), true);
        Ok(Self::from_tree(tree, options))
    }

    pub fn from_tree(tree: RouteTree, options: BuildOptions) -> Self {
        let app_dir = tree.app_dir().to_path_buf();
        Self {
            current: ArcSwap::from_pointee(tree),
            app_dir,
            options,
        }
    }

    /// Snapshot of the current tree.
    pub fn current(&self) -> Arc<RouteTree> {
        self.current.load_full()
    }

    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    /// Rebuild off the async runtime and swap in the new tree.
    ///
    /// On failure the previous tree stays in place.
    pub async fn rebuild(self: &Arc<Self>) -> Result<(), BuildError> {
        let table = Arc::clone(self);
        let result = tokio::task::spawn_blocking(move || {
            RouteTree::build(&table.app_dir, &table.options)
        })
        .await;

        let built = result.unwrap_or_else(|e| Err(BuildError::Interrupted(e.to_string())));

        match built {
            Ok(tree) => {
                metrics::record_route_build(tree.len(), true);
                self.replace(tree);
                Ok(())
            }
            Err(e) => {
                metrics::record_route_build(0, false);
                tracing::error!(error = %e, "Route rebuild failed, keeping current tree");
                Err(e)
            }
        }
    }

    /// Swap in a complete tree.
    pub fn replace(&self, tree: RouteTree) {
        tracing::info!(routes = ?tree.routes(), "Route tree replaced");
        self.current.store(Arc::new(tree));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_rebuild_swaps_without_touching_snapshots() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("page.html"), "").unwrap();

        let table = Arc::new(RouteTable::load(dir.path(), BuildOptions::default()).unwrap());
        let before = table.current();
        assert!(before.match_path("/about").is_none());

        fs::create_dir(dir.path().join("about")).unwrap();
        fs::write(dir.path().join("about/page.html"), "").unwrap();
        table.rebuild().await.unwrap();

        assert!(table.current().match_path("/about").is_some());
        assert!(before.match_path("/about").is_none(), "old snapshot unchanged");
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_previous_tree() {
        let dir = TempDir::new().unwrap();
        let app = dir.path().join("app");
        fs::create_dir(&app).unwrap();
        fs::write(app.join("page.html"), "").unwrap();

        let table = Arc::new(RouteTable::load(&app, BuildOptions::default()).unwrap());
        fs::remove_dir_all(&app).unwrap();

        assert!(table.rebuild().await.is_err());
        assert!(table.current().match_path("/").is_some());
    }
}
