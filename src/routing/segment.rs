//! Directory and file name classification.
//!
//! # Responsibilities
//! - Classify a directory name as a static, dynamic or catch-all segment
//! - Recognize special route files by exact base name and extension
//! - Decide which entries are private (never routable)
//!
//! # Design Decisions
//! - Names are case-sensitive (`Page.html` is not a page)
//! - Malformed brackets (`[]`, `[...]`, `[a`) fall back to static segments

use std::fmt;

/// Kind of a route segment, carrying the parameter name for non-static kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// Literal segment, matched by exact name.
    Static,
    /// `[name]`: captures exactly one path segment.
    Dynamic(String),
    /// `[...name]`: captures every remaining segment joined by `/`.
    CatchAll(String),
}

impl SegmentKind {
    /// Classify a raw directory name.
    pub fn classify(segment: &str) -> Self {
        let Some(inner) = segment
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
        else {
            return SegmentKind::Static;
        };

        if let Some(name) = inner.strip_prefix("...") {
            if is_param_name(name) {
                return SegmentKind::CatchAll(name.to_string());
            }
            return SegmentKind::Static;
        }

        if is_param_name(inner) {
            SegmentKind::Dynamic(inner.to_string())
        } else {
            SegmentKind::Static
        }
    }

    /// Parameter name bound by this segment, if any.
    pub fn param_name(&self) -> Option<&str> {
        match self {
            SegmentKind::Static => None,
            SegmentKind::Dynamic(name) | SegmentKind::CatchAll(name) => Some(name),
        }
    }
}

fn is_param_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['[', ']', '/'])
}

/// The recognized per-directory special files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialFile {
    Page,
    Layout,
    Loading,
    Error,
    NotFound,
}

impl SpecialFile {
    pub const ALL: [SpecialFile; 5] = [
        SpecialFile::Page,
        SpecialFile::Layout,
        SpecialFile::Loading,
        SpecialFile::Error,
        SpecialFile::NotFound,
    ];

    /// Base name on disk, without extension.
    pub fn base_name(self) -> &'static str {
        match self {
            SpecialFile::Page => "page",
            SpecialFile::Layout => "layout",
            SpecialFile::Loading => "loading",
            SpecialFile::Error => "error",
            SpecialFile::NotFound => "not-found",
        }
    }

    /// Recognize a file name such as `page.html` against the extension whitelist.
    pub fn recognize(file_name: &str, extensions: &[String]) -> Option<Self> {
        let (base, ext) = file_name.rsplit_once('.')?;
        if !extensions.iter().any(|e| e == ext) {
            return None;
        }
        Self::ALL.into_iter().find(|kind| kind.base_name() == base)
    }
}

impl fmt::Display for SpecialFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base_name())
    }
}

/// Entries starting with `_` or `.` are private: never routable.
pub fn is_private(name: &str) -> bool {
    name.starts_with('_') || name.starts_with('.')
}
