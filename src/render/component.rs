//! The component capability rendered by the pipeline.
//!
//! Components are supplied externally (registered in code or loaded from unit
//! files). The pipeline only composes them; it never inspects their markup.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::render::error::RenderError;
use crate::render::node::Node;
use crate::routing::Params;

/// Per-request inputs visible to every component.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    pub pathname: String,
    pub params: Params,
    /// Page props, also shipped to the client in the hydration payload.
    pub props: Value,
    /// Set when rendering an error fallback. Detail is only present in development.
    pub error: Option<String>,
}

impl RenderContext {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// A renderable unit: page, layout or fallback.
pub trait Component: Send + Sync {
    /// Produce markup. Layouts receive the composed subtree as `children`;
    /// every other unit receives `Node::Empty`.
    fn render(&self, cx: &RenderContext, children: Node) -> Result<Node, RenderError>;

    /// Static or parameter-dependent document metadata.
    fn metadata(&self, _params: &Params) -> Option<Metadata> {
        None
    }
}

impl<F> Component for F
where
    F: Fn(&RenderContext, Node) -> Result<Node, RenderError> + Send + Sync,
{
    fn render(&self, cx: &RenderContext, children: Node) -> Result<Node, RenderError> {
        self(cx, children)
    }
}

/// Title, description and social preview fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Metadata {
    /// Overlay `other` on top of `self`: fields set in `other` win.
    pub fn merge(&mut self, other: Metadata) {
        if other.title.is_some() {
            self.title = other.title;
        }
        if other.description.is_some() {
            self.description = other.description;
        }
        if other.image.is_some() {
            self.image = other.image;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.image.is_none()
    }
}
