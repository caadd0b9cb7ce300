use crate::host::{ActiveEditor, Host, ViewColumn};
use anyhow::{anyhow, Result};
use jsonnet_config::HostSettings;
use jsonnet_preview::{Document, PreviewUri};
use rpc::RpcClient;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Shareable handle of the editor host on the other side of stdio.
#[derive(Debug, Clone)]
pub struct Editor {
    rpc_client: Arc<RpcClient>,
}

impl Editor {
    pub fn new(rpc_client: Arc<RpcClient>) -> Self {
        Self { rpc_client }
    }

    /// Calls `method` in the host and returns the call result.
    pub async fn call<R: DeserializeOwned>(
        &self,
        method: impl AsRef<str>,
        params: impl Serialize,
    ) -> Result<R> {
        self.rpc_client
            .request(method, params)
            .await
            .map_err(|e| anyhow!("RpcError: {e:?}"))
    }

    /// Calls the method with no arguments.
    pub async fn bare_call<R: DeserializeOwned>(&self, method: impl AsRef<str>) -> Result<R> {
        self.call(method, json!([])).await
    }

    /// Executes `method` in the host, ignoring the result.
    pub fn exec(&self, method: impl AsRef<str>, params: impl Serialize) -> Result<()> {
        self.rpc_client
            .notify(method, params)
            .map_err(|e| anyhow!("RpcError: {e:?}"))
    }
}

#[async_trait::async_trait]
impl Host for Editor {
    async fn active_editor(&self) -> Result<Option<ActiveEditor>> {
        self.bare_call("active_editor").await
    }

    async fn settings(&self) -> Result<HostSettings> {
        let value: Value = self.call("settings", json!(["jsonnet"])).await?;
        Ok(HostSettings::from_value(value)?)
    }

    async fn open_document(&self, uri: &str) -> Result<Document> {
        self.call("open_document", json!([uri])).await
    }

    async fn document_line(&self, uri: &str, line: u32) -> Result<Option<String>> {
        self.call("document_line", json!([uri, line])).await
    }

    fn show_warning(&self, message: &str) -> Result<()> {
        self.exec("show_warning", json!([message]))
    }

    fn open_preview(&self, uri: &PreviewUri, column: ViewColumn, title: &str) -> Result<()> {
        self.exec("open_preview", json!([uri, column, title]))
    }

    fn preview_did_change(&self, uri: &PreviewUri) -> Result<()> {
        self.exec("preview_did_change", json!([uri]))
    }
}
