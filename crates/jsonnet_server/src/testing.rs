//! In-memory host recording what the plugin asks it to do.

use crate::host::{ActiveEditor, Host, ViewColumn};
use anyhow::{anyhow, Result};
use jsonnet_config::HostSettings;
use jsonnet_preview::{Document, PreviewUri};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Warning(String),
    OpenPreview {
        uri: PreviewUri,
        column: ViewColumn,
        title: String,
    },
    PreviewDidChange(PreviewUri),
}

#[derive(Debug, Default)]
pub struct FakeHost {
    active_editor: Option<ActiveEditor>,
    settings: HostSettings,
    settings_error: Option<String>,
    documents: HashMap<String, Document>,
    lines: HashMap<String, Vec<String>>,
    calls: Mutex<Vec<HostCall>>,
}

impl FakeHost {
    pub fn with_active_editor(mut self, editor: ActiveEditor) -> Self {
        self.active_editor = Some(editor);
        self
    }

    pub fn with_settings(mut self, settings: HostSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Makes `settings()` fail as if the host store could not be decoded.
    pub fn with_settings_error(mut self, message: &str) -> Self {
        self.settings_error = Some(message.to_string());
        self
    }

    pub fn with_document(mut self, document: Document) -> Self {
        self.documents.insert(document.uri.clone(), document);
        self
    }

    pub fn with_lines(mut self, uri: &str, lines: &[&str]) -> Self {
        self.lines.insert(
            uri.to_string(),
            lines.iter().map(|line| line.to_string()).collect(),
        );
        self
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: HostCall) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Host for FakeHost {
    async fn active_editor(&self) -> Result<Option<ActiveEditor>> {
        Ok(self.active_editor.clone())
    }

    async fn settings(&self) -> Result<HostSettings> {
        match &self.settings_error {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(self.settings.clone()),
        }
    }

    async fn open_document(&self, uri: &str) -> Result<Document> {
        self.documents
            .get(uri)
            .cloned()
            .ok_or_else(|| anyhow!("no document at {uri}"))
    }

    async fn document_line(&self, uri: &str, line: u32) -> Result<Option<String>> {
        Ok(self
            .lines
            .get(uri)
            .and_then(|lines| lines.get(line as usize))
            .cloned())
    }

    fn show_warning(&self, message: &str) -> Result<()> {
        self.record(HostCall::Warning(message.to_string()))
    }

    fn open_preview(&self, uri: &PreviewUri, column: ViewColumn, title: &str) -> Result<()> {
        self.record(HostCall::OpenPreview {
            uri: uri.clone(),
            column,
            title: title.to_string(),
        })
    }

    fn preview_did_change(&self, uri: &PreviewUri) -> Result<()> {
        self.record(HostCall::PreviewDidChange(uri.clone()))
    }
}
