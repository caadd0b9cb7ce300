//! Services the editor host offers to the previewer.

use anyhow::Result;
use jsonnet_config::HostSettings;
use jsonnet_preview::{Document, PreviewUri};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Column of an editor pane, starting from 1.
///
/// Columns reported by the host are clamped like [`ViewColumn::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct ViewColumn(u8);

impl ViewColumn {
    pub const ONE: Self = Self(1);

    /// Rightmost column a preview may be opened in.
    pub const MAX: Self = Self(3);

    pub fn new(column: u8) -> Self {
        Self(column.clamp(Self::ONE.0, Self::MAX.0))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Column to the right, the last column stays where it is.
    pub fn beside(self) -> Self {
        Self::new(self.0.saturating_add(1))
    }
}

impl From<u8> for ViewColumn {
    fn from(column: u8) -> Self {
        Self::new(column)
    }
}

impl From<ViewColumn> for u8 {
    fn from(column: ViewColumn) -> Self {
        column.0
    }
}

/// Column the preview of the active editor goes to.
pub fn preview_column(active: Option<ViewColumn>, side_by_side: bool) -> ViewColumn {
    let active = active.unwrap_or(ViewColumn::ONE);
    if side_by_side {
        active.beside()
    } else {
        active
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveEditor {
    pub uri: String,
    pub file_name: PathBuf,
    pub language_id: String,
    #[serde(default)]
    pub view_column: Option<ViewColumn>,
}

#[async_trait::async_trait]
pub trait Host: Send + Sync + 'static {
    /// Returns the editor having the focus, if any.
    async fn active_editor(&self) -> Result<Option<ActiveEditor>>;

    /// Returns the `jsonnet` section of the host configuration store.
    async fn settings(&self) -> Result<HostSettings>;

    async fn open_document(&self, uri: &str) -> Result<Document>;

    /// Returns the 0-based `line` of the document, `None` if out of range.
    async fn document_line(&self, uri: &str, line: u32) -> Result<Option<String>>;

    fn show_warning(&self, message: &str) -> Result<()>;

    fn open_preview(&self, uri: &PreviewUri, column: ViewColumn, title: &str) -> Result<()>;

    /// Asks the host to fetch the content of `uri` again.
    fn preview_did_change(&self, uri: &PreviewUri) -> Result<()>;
}
