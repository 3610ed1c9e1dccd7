//! Pending image attachment and its URL conventions
//!
//! Uploaded images are referenced through a local proxy URL of the form
//! `<origin>/api/blob.jpg?bcid=<blob id>`. When the image is sent to the
//! remote agent the proxy URL is rewritten to the provider's own endpoint.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Upload lifecycle of the pending attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentStatus {
    Loading,
    Loaded,
    Error,
}

/// The single image tracked for inclusion in the next sent message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub status: AttachmentStatus,
}

impl Attachment {
    pub fn loading(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: AttachmentStatus::Loading,
        }
    }

    pub fn loaded(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: AttachmentStatus::Loaded,
        }
    }

    pub fn failed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: AttachmentStatus::Error,
        }
    }

    /// URL to embed in the outgoing message, only once the upload finished
    pub fn loaded_url(&self) -> Option<&str> {
        (self.status == AttachmentStatus::Loaded).then_some(self.url.as_str())
    }
}

fn proxy_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"api/blob\.jpg\?bcid=([^&]+)").expect("proxy URL pattern is valid")
    })
}

/// Build the local proxy URL that references an uploaded blob
pub fn proxy_url(origin: &str, blob_id: &str) -> String {
    format!("{}/api/blob.jpg?bcid={blob_id}", origin.trim_end_matches('/'))
}

/// Extract the blob id from a proxy URL
pub fn blob_id(url: &str) -> Option<&str> {
    proxy_pattern()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Resolve the image URL handed to the transport.
///
/// Proxy URLs are rewritten to `provider_url?bcid=<id>`; anything else passes
/// through unchanged. In image-only mode no image is sent at all.
pub fn outgoing_image_url(url: &str, provider_url: &str, image_only: bool) -> Option<String> {
    if image_only {
        return None;
    }
    Some(match blob_id(url) {
        Some(id) => format!("{provider_url}?bcid={id}"),
        None => url.to_string(),
    })
}

/// Text of the user message, with the image reference appended when present
pub fn compose_user_text(text: &str, image_url: Option<&str>) -> String {
    match image_url {
        Some(url) => format!("{text}\n\n![image]({url})"),
        None => text.to_string(),
    }
}
