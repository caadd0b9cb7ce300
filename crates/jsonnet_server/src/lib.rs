//! Stdio server connecting the Jsonnet previewer to the editor host.
//!
//! The host forwards its commands and events as JSON-RPC messages, which are
//! dispatched to [`JsonnetPlugin`], and the plugin talks back through [`Host`].

mod editor;
mod host;
mod input;
mod plugin;
#[cfg(test)]
mod testing;

use self::input::{Autocmd, Event, HoverParams, Request};
use anyhow::{anyhow, Result};
use jsonnet_preview::{PreviewConfig, PreviewUri};
use rpc::{HostMessage, Params, RpcClient, RpcNotification, RpcRequest};
use serde_json::{json, Value};
use std::io::{BufReader, BufWriter};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

pub use self::editor::Editor;
pub use self::host::{preview_column, ActiveEditor, Host, ViewColumn};
pub use self::input::JsonnetAction;
pub use self::plugin::{JsonnetPlugin, LANGUAGE_ID};

/// Starts and keeps running the server on top of stdio until the host exits.
///
/// `base_config` holds the options from the config file, `config_err` is the
/// error of parsing it, reported to the user once the host is reachable.
pub async fn start(base_config: PreviewConfig, config_err: Option<toml::de::Error>) {
    let (host_message_tx, host_message_rx) = tokio::sync::mpsc::unbounded_channel();

    let rpc_client = Arc::new(RpcClient::new(
        BufReader::new(std::io::stdin()),
        BufWriter::new(std::io::stdout()),
        host_message_tx,
    ));

    let editor = Editor::new(rpc_client.clone());

    if let Some(err) = config_err {
        let warning = format!("Invalid config file, using the default options: {err}");
        if let Err(err) = editor.show_warning(&warning) {
            tracing::error!(?err, "Failed to report the config error");
        }
    }

    let plugin = Arc::new(JsonnetPlugin::new(editor, base_config));
    let change_forwarder = plugin.forward_changes();

    tokio::spawn({
        let plugin = plugin.clone();
        async move {
            if let Err(err) = plugin.activate().await {
                tracing::error!(?err, "Failed to activate the jsonnet plugin");
            }
        }
    });

    Client { plugin, rpc_client }
        .loop_host_messages(host_message_rx)
        .await;

    change_forwarder.abort();
}

#[derive(Clone)]
struct Client {
    plugin: Arc<JsonnetPlugin<Editor>>,
    rpc_client: Arc<RpcClient>,
}

impl Client {
    /// Entry of the bridge between the host and Rust.
    async fn loop_host_messages(self, mut rx: UnboundedReceiver<HostMessage>) {
        while let Some(host_message) = rx.recv().await {
            match host_message {
                HostMessage::Notification(notification) => {
                    if Event::from_method(&notification.method) == Event::Exit {
                        tracing::debug!("Host asked to exit");
                        return;
                    }
                    self.process_notification(notification);
                }
                HostMessage::Request(request) => self.process_request(request),
            }
        }

        tracing::debug!("Host message channel closed");
    }

    fn process_notification(&self, notification: RpcNotification) {
        let plugin = self.plugin.clone();

        tokio::spawn(async move {
            let method = notification.method.clone();
            if let Err(err) = handle_notification(&plugin, notification).await {
                tracing::error!(?err, %method, "Error at processing host notification");
            }
        });
    }

    fn process_request(&self, request: RpcRequest) {
        let client = self.clone();

        tokio::spawn(async move {
            let id = request.id.clone();
            let method = request.method.clone();

            let result = handle_request(&client.plugin, request).await;
            if let Err(err) = &result {
                tracing::debug!(%err, %method, "Host request failed");
            }

            if let Err(err) = client.rpc_client.send_response(id, result) {
                tracing::error!(?err, %method, "Failed to send the response");
            }
        });
    }
}

async fn handle_notification<H: Host>(
    plugin: &JsonnetPlugin<H>,
    notification: RpcNotification,
) -> Result<()> {
    match Event::from_method(&notification.method) {
        Event::Action(action) => plugin.preview(action.side_by_side()).await?,
        Event::Autocmd(Autocmd::BufWritePost) => {
            let uri: String = notification.params.parse_first()?;
            plugin.on_did_save(&uri);
        }
        Event::Exit => {}
        Event::Request(_) | Event::Other(_) => {
            return Err(anyhow!("Unknown notification: {}", notification.method));
        }
    }

    Ok(())
}

async fn handle_request<H: Host>(
    plugin: &JsonnetPlugin<H>,
    request: RpcRequest,
) -> Result<Value, rpc::Error> {
    match Event::from_method(&request.method) {
        Event::Request(Request::ProvideContent) => {
            let uri: String = request.params.parse_first()?;
            let uri =
                PreviewUri::parse(uri).map_err(|err| rpc::Error::invalid_params(err.to_string()))?;
            Ok(json!(plugin.provide_content(&uri).await))
        }
        Event::Request(Request::Completion) => serde_json::to_value(plugin.completion())
            .map_err(|err| rpc::Error::internal_error(err.to_string())),
        Event::Request(Request::Hover) => {
            let params: HoverParams = match request.params {
                params @ Params::Array(_) => params.parse_first()?,
                params => params.parse()?,
            };
            let hover = plugin
                .hover(params)
                .await
                .map_err(|err| rpc::Error::internal_error(err.to_string()))?;
            serde_json::to_value(hover).map_err(|err| rpc::Error::internal_error(err.to_string()))
        }
        _ => Err(rpc::Error::method_not_found(&request.method)),
    }
}
