//! Server side of the hydration protocol.
//!
//! The server embeds a `HydrationPayload` in every document and answers
//! navigation requests with the same payload as JSON. Unit ids in the payload
//! resolve through the manifest served at `/_treeline/manifest.json`.

pub mod payload;

pub use payload::{extract_payload, manifest, HydrationPayload, PayloadError};
