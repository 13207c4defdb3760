//! Document-level markup: injected blocks and built-in pages.

use crate::hydration::HydrationPayload;
use crate::render::component::Metadata;
use crate::render::node::escape_html;

/// Element id of the embedded hydration payload.
pub const PAYLOAD_ELEMENT_ID: &str = "__treeline_data";

/// Swaps a resolved boundary (`tl-s{id}`) into its placeholder (`tl-b{id}`),
/// removing the fallback between `<!--$?-->` and the matching `<!--/$-->`.
pub const PATCH_RUNTIME: &str = concat!(
    "<script>function $TL(i){",
    "var b=document.getElementById(\"tl-b\"+i),s=document.getElementById(\"tl-s\"+i);",
    "if(!b||!s)return;var p=b.parentNode,n=b.nextSibling,d=0;",
    "while(n){if(n.nodeType===8){if(n.data===\"/$\"){if(d===0)break;d--}else if(n.data===\"$?\")d++}",
    "var x=n.nextSibling;p.removeChild(n);n=x}",
    "if(n)p.removeChild(n);var o=b.previousSibling;",
    "if(o&&o.nodeType===8&&o.data===\"$?\")p.removeChild(o);",
    "while(s.firstChild)p.insertBefore(s.firstChild,b);",
    "p.removeChild(b);s.parentNode.removeChild(s)}</script>"
);

/// Inline indicator for content that signaled not-found after commit.
pub const INLINE_NOT_FOUND: &str =
    "<p data-treeline-not-found>This content could not be found.</p>";

/// Inline indicator for a boundary that failed after commit.
pub fn inline_error(detail: Option<&str>) -> String {
    match detail {
        Some(detail) => format!(
            "<div role=\"alert\" data-treeline-error>Something went wrong.<pre>{}</pre></div>",
            escape_html(detail)
        ),
        None => "<div role=\"alert\" data-treeline-error>Something went wrong.</div>".to_string(),
    }
}

/// Minimal document around markup that has no `<html>` of its own.
pub fn default_document(body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"></head><body>{}</body></html>",
        body
    )
}

/// Metadata and the client entry script, spliced before `</head>`.
pub fn head_block(metadata: &Metadata, client_entry: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(title) = &metadata.title {
        let title = escape_html(title);
        out.push_str(&format!("<title>{}</title>", title));
        out.push_str(&format!("<meta property=\"og:title\" content=\"{}\">", title));
    }
    if let Some(description) = &metadata.description {
        let description = escape_html(description);
        out.push_str(&format!(
            "<meta name=\"description\" content=\"{}\">",
            description
        ));
        out.push_str(&format!(
            "<meta property=\"og:description\" content=\"{}\">",
            description
        ));
    }
    if let Some(image) = &metadata.image {
        out.push_str(&format!(
            "<meta property=\"og:image\" content=\"{}\">",
            escape_html(image)
        ));
    }
    if let Some(entry) = client_entry {
        out.push_str(&format!(
            "<script type=\"module\" src=\"{}\" async></script>",
            escape_html(entry)
        ));
    }
    out
}

/// The hydration payload, spliced before `</body>`.
pub fn payload_block(payload: &HydrationPayload) -> Result<String, serde_json::Error> {
    Ok(format!(
        "<script id=\"{}\" type=\"application/json\">{}</script>",
        PAYLOAD_ELEMENT_ID,
        payload.to_embedded_json()?
    ))
}

/// Built-in 404 page, used when the tree has no not-found file.
pub fn generic_not_found() -> String {
    default_document(
        "<main data-treeline-not-found><h1>404</h1><p>This page could not be found.</p></main>",
    )
}

/// Built-in 500 page. `detail` is only set in the development posture.
pub fn generic_error(detail: Option<&str>) -> String {
    let detail = detail
        .map(|d| format!("<pre>{}</pre>", escape_html(d)))
        .unwrap_or_default();
    default_document(&format!(
        "<main data-treeline-error><h1>500</h1><p>Internal Server Error</p>{}</main>",
        detail
    ))
}
