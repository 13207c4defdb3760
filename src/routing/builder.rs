//! Route tree construction from an app directory.
//!
//! # Data Flow
//! ```text
//! app/ (directories + special files)
//!     → scan (pass 1): immutable ScannedDir records, sorted by name
//!     → link (pass 2): arena nodes with parent links and child slots
//!     → RouteTree (read-only)
//! ```
//!
//! # Design Decisions
//! - Unreadable subdirectories are warned about and treated as empty
//! - Only an unreadable app root fails the build
//! - Sibling order is sorted, so "first registered wins" is deterministic
//! - Slot conflicts warn by default and fail the build in strict mode

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;

use crate::routing::segment::{is_private, SegmentKind, SpecialFile};
use crate::routing::tree::{NodeId, RouteFile, RouteNode, RouteTree, UnitIdMode};

/// Options controlling a build pass.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Accepted special file extensions (without the dot).
    pub extensions: Vec<String>,
    /// Fail on conflicting dynamic / catch-all siblings instead of warning.
    pub strict: bool,
    /// How unit identifiers are derived.
    pub id_mode: UnitIdMode,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["html".to_string(), "htm".to_string()],
            strict: false,
            id_mode: UnitIdMode::Path,
        }
    }
}

/// Errors that abort a build pass.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The app directory itself could not be read.
    #[error("cannot read app directory {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two siblings claim the same dynamic or catch-all slot (strict mode only).
    #[error("ambiguous route at /{parent}: '{kept}' and '{rejected}' both claim the {slot} slot")]
    AmbiguousSegment {
        parent: String,
        slot: &'static str,
        kept: String,
        rejected: String,
    },

    /// The background build task panicked or was cancelled.
    #[error("route build interrupted: {0}")]
    Interrupted(String),
}

/// Pass 1 output: one directory, fully read, never mutated afterwards.
#[derive(Debug)]
struct ScannedDir {
    segment: String,
    /// `/`-separated path relative to the app directory ("" for the root).
    relative: String,
    files: Vec<RouteFile>,
    subdirs: Vec<ScannedDir>,
}

impl RouteTree {
    /// Scan `app_dir` and build a route tree.
    pub fn build(app_dir: &Path, options: &BuildOptions) -> Result<RouteTree, BuildError> {
        let started = Instant::now();

        let entries = fs::read_dir(app_dir).map_err(|source| BuildError::RootUnreadable {
            path: app_dir.to_path_buf(),
            source,
        })?;
        let root = scan_entries(entries, app_dir, String::new(), String::new(), options);

        let mut nodes = Vec::new();
        link(&mut nodes, root, SegmentKind::Static, None, options)?;

        let tree = RouteTree {
            nodes,
            app_dir: app_dir.to_path_buf(),
        };

        tracing::info!(
            app_dir = %app_dir.display(),
            nodes = tree.len(),
            routes = tree.routes().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Route tree built"
        );
        Ok(tree)
    }
}

fn scan_dir(dir: &Path, segment: String, relative: String, options: &BuildOptions) -> ScannedDir {
    match fs::read_dir(dir) {
        Ok(entries) => scan_entries(entries, dir, segment, relative, options),
        Err(e) => {
            tracing::warn!(
                path = %dir.display(),
                error = %e,
                "Failed to read route directory, treating as empty"
            );
            ScannedDir {
                segment,
                relative,
                files: Vec::new(),
                subdirs: Vec::new(),
            }
        }
    }
}

fn scan_entries(
    entries: fs::ReadDir,
    dir: &Path,
    segment: String,
    relative: String,
    options: &BuildOptions,
) -> ScannedDir {
    let mut listing: Vec<(String, PathBuf)> = Vec::new();
    for entry in entries {
        match entry {
            Ok(entry) => {
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    tracing::warn!(path = %entry.path().display(), "Skipping non UTF-8 entry");
                    continue;
                };
                if is_private(&name) {
                    continue;
                }
                listing.push((name, entry.path()));
            }
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "Failed to read directory entry");
            }
        }
    }
    listing.sort_by(|a, b| a.0.cmp(&b.0));

    let mut files: Vec<RouteFile> = Vec::new();
    let mut subdirs = Vec::new();

    for (name, path) in listing {
        let child_relative = if relative.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", relative, name)
        };

        if path.is_dir() {
            subdirs.push(scan_dir(&path, name, child_relative, options));
            continue;
        }

        let Some(kind) = SpecialFile::recognize(&name, &options.extensions) else {
            continue;
        };
        if let Some(existing) = files.iter().find(|f| f.kind == kind) {
            tracing::warn!(
                kept = %existing.relative,
                ignored = %child_relative,
                "Duplicate {} file in directory, keeping the first",
                kind
            );
            continue;
        }
        files.push(RouteFile::new(kind, path, child_relative, options.id_mode));
    }

    ScannedDir {
        segment,
        relative,
        files,
        subdirs,
    }
}

fn link(
    nodes: &mut Vec<RouteNode>,
    scanned: ScannedDir,
    kind: SegmentKind,
    parent: Option<NodeId>,
    options: &BuildOptions,
) -> Result<NodeId, BuildError> {
    let id = NodeId(nodes.len());
    let terminal = matches!(kind, SegmentKind::CatchAll(_));
    let mut node = RouteNode::new(scanned.segment, kind, parent);
    for file in scanned.files {
        let kind = file.kind;
        *node.files.slot_mut(kind) = Some(file);
    }
    nodes.push(node);

    // A catch-all ends the walk, nothing below it is reachable
    if terminal {
        for sub in &scanned.subdirs {
            tracing::warn!(
                parent = %format!("/{}", scanned.relative),
                ignored = %sub.segment,
                "Directory under a catch-all segment is unreachable, skipping"
            );
        }
        return Ok(id);
    }

    for sub in scanned.subdirs {
        let kind = SegmentKind::classify(&sub.segment);
        let slot = match kind {
            SegmentKind::Static => None,
            SegmentKind::Dynamic(_) => Some(("dynamic", nodes[id.0].dynamic_child)),
            SegmentKind::CatchAll(_) => Some(("catch-all", nodes[id.0].catch_all_child)),
        };

        if let Some((slot, Some(existing))) = slot {
            let kept = nodes[existing.0].segment.clone();
            if options.strict {
                return Err(BuildError::AmbiguousSegment {
                    parent: scanned.relative,
                    slot,
                    kept,
                    rejected: sub.segment,
                });
            }
            tracing::warn!(
                parent = %format!("/{}", scanned.relative),
                kept = %kept,
                ignored = %sub.segment,
                "Conflicting {} segment, keeping the first registered",
                slot
            );
            continue;
        }

        let segment = sub.segment.clone();
        let child = link(nodes, sub, kind.clone(), Some(id), options)?;
        let node = &mut nodes[id.0];
        match kind {
            SegmentKind::Static => {
                node.children.insert(segment, child);
            }
            SegmentKind::Dynamic(_) => node.dynamic_child = Some(child),
            SegmentKind::CatchAll(_) => node.catch_all_child = Some(child),
        }
    }

    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "<p>x</p>").unwrap();
    }

    #[test]
    fn test_build_nested_tree() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "layout.html");
        touch(dir.path(), "page.html");
        touch(dir.path(), "blog/page.html");
        touch(dir.path(), "blog/[slug]/page.html");
        touch(dir.path(), "docs/[...rest]/page.html");

        let tree = RouteTree::build(dir.path(), &BuildOptions::default()).unwrap();
        assert_eq!(
            tree.routes(),
            vec!["/", "/blog", "/blog/[slug]", "/docs/[...rest]"]
        );

        let root = tree.root();
        assert!(root.files.layout.is_some());
        let blog = tree.node(root.children["blog"]);
        let slug = tree.node(blog.dynamic_child.unwrap());
        assert_eq!(slug.kind, SegmentKind::Dynamic("slug".into()));
        assert_eq!(slug.parent, Some(root.children["blog"]));
        assert_eq!(
            slug.files.page.as_ref().unwrap().relative,
            "blog/[slug]/page.html"
        );
    }

    #[test]
    fn test_private_and_unknown_entries_skipped() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "page.html");
        touch(dir.path(), "_components/page.html");
        touch(dir.path(), ".cache/page.html");
        touch(dir.path(), "about/page.tsx");
        touch(dir.path(), "about/readme.html");

        let tree = RouteTree::build(dir.path(), &BuildOptions::default()).unwrap();
        assert_eq!(tree.routes(), vec!["/"]);
        assert!(!tree.root().children.contains_key("_components"));
        assert!(!tree.root().children.contains_key(".cache"));
        let about = tree.node(tree.root().children["about"]);
        assert!(about.files.iter().next().is_none());
    }

    #[test]
    fn test_conflicting_dynamic_slot_keeps_first() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "posts/[id]/page.html");
        touch(dir.path(), "posts/[slug]/page.html");

        let tree = RouteTree::build(dir.path(), &BuildOptions::default()).unwrap();
        let posts = tree.node(tree.root().children["posts"]);
        let dynamic = tree.node(posts.dynamic_child.unwrap());
        assert_eq!(dynamic.segment, "[id]");
        assert_eq!(tree.routes(), vec!["/posts/[id]"]);
    }

    #[test]
    fn test_conflicting_catch_all_fails_in_strict_mode() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "docs/[...a]/page.html");
        touch(dir.path(), "docs/[...b]/page.html");

        let options = BuildOptions {
            strict: true,
            ..BuildOptions::default()
        };
        let err = RouteTree::build(dir.path(), &options).unwrap_err();
        match err {
            BuildError::AmbiguousSegment {
                slot,
                kept,
                rejected,
                ..
            } => {
                assert_eq!(slot, "catch-all");
                assert_eq!(kept, "[...a]");
                assert_eq!(rejected, "[...b]");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_directories_under_catch_all_are_skipped_with_warning() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "docs/[...rest]/page.html");
        touch(dir.path(), "docs/[...rest]/extra/page.html");

        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let tree = tracing::subscriber::with_default(subscriber, || {
            RouteTree::build(dir.path(), &BuildOptions::default())
        })
        .unwrap();

        assert_eq!(tree.routes(), vec!["/docs/[...rest]"]);
        assert!(tree.files().all(|f| f.relative != "docs/[...rest]/extra/page.html"));
        let m = tree.match_path("/docs/a/extra").unwrap();
        assert_eq!(m.params.get("rest").map(String::as_str), Some("a/extra"));

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("unreachable"), "missing warning in: {output}");
        assert!(output.contains("extra"));
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            RouteTree::build(&missing, &BuildOptions::default()),
            Err(BuildError::RootUnreadable { .. })
        ));
    }

    #[test]
    fn test_hashed_ids_do_not_leak_paths() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "secret/page.html");
        let options = BuildOptions {
            id_mode: UnitIdMode::Hashed,
            ..BuildOptions::default()
        };
        let tree = RouteTree::build(dir.path(), &options).unwrap();
        for file in tree.files() {
            assert!(!file.id.contains("secret"));
        }
    }
}
