//! Content provider backing the preview documents.

use crate::html;
use crate::render::render_file;
use crate::uri::PreviewUri;
use jsonnet_config::PreviewConfig;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::PathBuf;
use tokio::sync::broadcast;

/// A text document opened by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub uri: String,
    /// Path of the document on disk.
    pub file_name: PathBuf,
    pub language_id: String,
}

/// Services of the host workspace needed to produce a preview.
#[async_trait::async_trait]
pub trait Workspace: Send + Sync {
    type Error: Display + Send;

    /// Opens the source document at `uri`.
    async fn open_document(&self, uri: &str) -> Result<Document, Self::Error>;

    /// Returns the effective preview configuration at the time of the call.
    async fn preview_config(&self) -> Result<PreviewConfig, Self::Error>;
}

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Serves the rendered content of preview documents and announces when a
/// preview has to be fetched again.
#[derive(Debug, Clone)]
pub struct ContentProvider {
    changes: broadcast::Sender<PreviewUri>,
}

impl Default for ContentProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentProvider {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { changes }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PreviewUri> {
        self.changes.subscribe()
    }

    /// Announces that the content of `uri` has changed.
    ///
    /// Idempotent, updating a preview nobody looks at is harmless.
    pub fn update(&self, uri: &PreviewUri) {
        if self.changes.send(uri.clone()).is_err() {
            tracing::trace!(%uri, "No subscriber for preview changes");
        }
    }

    /// Produces the current content of the preview `uri`.
    ///
    /// Never fails, every error is turned into an error document.
    pub async fn provide<W: Workspace + ?Sized>(&self, uri: &PreviewUri, workspace: &W) -> String {
        let source = match uri.source() {
            Ok(source) => source,
            Err(err) => return html::error_document(&err.to_string()),
        };

        let document = match workspace.open_document(&source).await {
            Ok(document) => document,
            Err(err) => {
                tracing::debug!(%source, %err, "Failed to open source document");
                return html::error_document(&format!("Failed to open {source}: {err}"));
            }
        };

        let config = match workspace.preview_config().await {
            Ok(config) => config,
            Err(err) => return html::error_document(&err.to_string()),
        };

        render_file(&config, &document.file_name).await
    }
}
