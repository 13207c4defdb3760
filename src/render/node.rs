//! Markup tree produced by components.
//!
//! A `Node` is either plain markup or a deferred boundary whose content is
//! produced by a future. The shell renders every non-deferred node; deferred
//! boundaries render their fallback first and are patched later in-stream.

use std::fmt;
use std::future::Future;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::render::error::RenderError;

/// Renderable markup.
pub enum Node {
    Empty,
    /// Text, escaped on output.
    Text(String),
    /// Trusted markup, written verbatim.
    Raw(String),
    List(Vec<Node>),
    Deferred(Deferred),
}

/// A boundary whose content resolves asynchronously.
pub struct Deferred {
    pub(crate) fallback: Option<Box<Node>>,
    pub(crate) content: BoxFuture<'static, Result<Node, RenderError>>,
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn raw(markup: impl Into<String>) -> Self {
        Node::Raw(markup.into())
    }

    pub fn list(nodes: impl IntoIterator<Item = Node>) -> Self {
        Node::List(nodes.into_iter().collect())
    }

    /// Deferred content shown behind the nearest loading fallback.
    pub fn deferred<F>(content: F) -> Self
    where
        F: Future<Output = Result<Node, RenderError>> + Send + 'static,
    {
        Node::Deferred(Deferred {
            fallback: None,
            content: content.boxed(),
        })
    }

    /// Deferred content with its own placeholder.
    pub fn deferred_with_fallback<F>(fallback: Node, content: F) -> Self
    where
        F: Future<Output = Result<Node, RenderError>> + Send + 'static,
    {
        Node::Deferred(Deferred {
            fallback: Some(Box::new(fallback)),
            content: content.boxed(),
        })
    }

    /// Wrap `children` between two markup fragments.
    pub fn wrap(before: impl Into<String>, children: Node, after: impl Into<String>) -> Self {
        Node::List(vec![Node::Raw(before.into()), children, Node::Raw(after.into())])
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Empty => f.write_str("Empty"),
            Node::Text(t) => f.debug_tuple("Text").field(t).finish(),
            Node::Raw(r) => f.debug_tuple("Raw").field(r).finish(),
            Node::List(nodes) => f.debug_tuple("List").field(nodes).finish(),
            Node::Deferred(d) => f
                .debug_struct("Deferred")
                .field("fallback", &d.fallback)
                .finish_non_exhaustive(),
        }
    }
}

/// Escape text for HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }
}
