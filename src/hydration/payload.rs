//! The data shipped to the client for hydration and soft navigation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::render::component::Metadata;
use crate::render::composition::RenderComposition;
use crate::render::document::PAYLOAD_ELEMENT_ID;
use crate::routing::{Params, RouteTree};

/// Everything the client needs to take over a server-rendered page.
///
/// Unit fields carry opaque ids, never file paths (in production).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydrationPayload {
    #[serde(default)]
    pub props: Value,
    pub layout_ids: Vec<String>,
    pub page_id: String,
    #[serde(default)]
    pub params: Params,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loading_id: Option<String>,
}

impl HydrationPayload {
    pub fn from_composition(
        composition: &RenderComposition,
        props: Value,
        params: Params,
        metadata: Metadata,
    ) -> Self {
        Self {
            props,
            layout_ids: composition.layouts.iter().map(|f| f.id.clone()).collect(),
            page_id: composition.page.id.clone(),
            params,
            metadata: (!metadata.is_empty()).then_some(metadata),
            error_id: composition.error.as_ref().map(|f| f.id.clone()),
            loading_id: composition.loading.as_ref().map(|f| f.id.clone()),
        }
    }

    /// Every unit id the client must resolve, layouts first.
    pub fn unit_ids(&self) -> impl Iterator<Item = &str> {
        self.layout_ids
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.page_id.as_str()))
    }

    /// JSON that is safe inside a `<script>` element.
    ///
    /// `<`, `>` and `&` are written as unicode escapes so user data can never
    /// close the element; U+2028/U+2029 are escaped for older JS parsers.
    pub fn to_embedded_json(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        let mut out = String::with_capacity(json.len() + 16);
        for ch in json.chars() {
            match ch {
                '<' => out.push_str("\\u003c"),
                '>' => out.push_str("\\u003e"),
                '&' => out.push_str("\\u0026"),
                '\u{2028}' => out.push_str("\\u2028"),
                '\u{2029}' => out.push_str("\\u2029"),
                c => out.push(c),
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("document has no hydration payload")]
    Missing,

    #[error("malformed hydration payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Read the payload embedded in a server-rendered document.
pub fn extract_payload(html: &str) -> Result<HydrationPayload, PayloadError> {
    let marker = format!("id=\"{}\"", PAYLOAD_ELEMENT_ID);
    let at = html.find(&marker).ok_or(PayloadError::Missing)?;
    let open_end = html[at..].find('>').ok_or(PayloadError::Missing)? + at + 1;
    let close = html[open_end..]
        .find("</script>")
        .ok_or(PayloadError::Missing)?
        + open_end;
    Ok(serde_json::from_str(&html[open_end..close])?)
}

/// Map from unit id to the URL the client loads it from.
pub fn manifest(tree: &RouteTree, asset_prefix: &str) -> BTreeMap<String, String> {
    let prefix = asset_prefix.trim_end_matches('/');
    tree.files()
        .map(|file| (file.id.clone(), format!("{}/{}", prefix, file.relative)))
        .collect()
}
