use crate::host::{preview_column, Host};
use crate::input::HoverParams;
use anyhow::Result;
use jsonnet_preview::{
    ContentProvider, Document, PreviewConfig, PreviewUri, RenderConfig, Workspace,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Language id of the documents that can be previewed.
pub const LANGUAGE_ID: &str = "jsonnet";

/// Acknowledgment shown above the hovered line.
const HOVER_ACKNOWLEDGMENT: &str = "Jsonnet";

/// Previews Jsonnet documents in the host and serves the language stubs.
#[derive(Debug)]
pub struct JsonnetPlugin<H> {
    host: H,
    /// Options from the config file, overridden by the host settings on every use.
    base_config: PreviewConfig,
    provider: ContentProvider,
}

impl<H: Host> JsonnetPlugin<H> {
    pub fn new(host: H, base_config: PreviewConfig) -> Self {
        Self {
            host,
            base_config,
            provider: ContentProvider::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Effective preview config at this moment.
    async fn preview_config(&self) -> Result<PreviewConfig> {
        let settings = self.host.settings().await?;
        Ok(self.base_config.with_host_settings(settings))
    }

    /// Resolves the effective render config, or the warning to show instead.
    async fn render_config(&self) -> std::result::Result<RenderConfig, String> {
        let config = self
            .preview_config()
            .await
            .map_err(|err| format!("Invalid jsonnet settings: {err:#}"))?;
        RenderConfig::resolve(&config).map_err(|err| err.to_string())
    }

    /// Checks once that the compiler can be found, warning the user otherwise.
    pub async fn activate(&self) -> Result<()> {
        match self.render_config().await {
            Ok(render_config) => {
                tracing::debug!(
                    executable = ?render_config.executable,
                    "Jsonnet compiler resolved"
                );
                Ok(())
            }
            Err(warning) => self.host.show_warning(&warning),
        }
    }

    /// Opens the preview of the active editor.
    pub async fn preview(&self, side_by_side: bool) -> Result<()> {
        let Some(editor) = self.host.active_editor().await? else {
            return self.host.show_warning("No active editor to preview");
        };

        if editor.language_id != LANGUAGE_ID {
            return self.host.show_warning(&format!(
                "Only Jsonnet documents can be previewed, the active document is `{}`",
                editor.language_id
            ));
        }

        if let Err(warning) = self.render_config().await {
            return self.host.show_warning(&warning);
        }

        let uri = PreviewUri::from_source(&editor.uri);
        let column = preview_column(editor.view_column, side_by_side);
        let file_name = editor
            .file_name
            .file_name()
            .unwrap_or(editor.file_name.as_os_str())
            .to_string_lossy();

        tracing::debug!(%uri, ?column, "Opening jsonnet preview");

        self.host
            .open_preview(&uri, column, &format!("Jsonnet preview '{file_name}'"))
    }

    /// Announces that the preview of the saved document is stale.
    pub fn on_did_save(&self, uri: &str) {
        self.provider.update(&PreviewUri::from_source(uri));
    }

    pub async fn provide_content(&self, uri: &PreviewUri) -> String {
        let workspace = HostWorkspace {
            host: &self.host,
            base_config: &self.base_config,
        };
        self.provider.provide(uri, &workspace).await
    }

    pub fn completion(&self) -> lsp::CompletionResponse {
        lsp::CompletionResponse::Array(Vec::new())
    }

    pub async fn hover(&self, params: HoverParams) -> Result<Option<lsp::Hover>> {
        let HoverParams {
            uri,
            line,
            character,
        } = params;

        let Some(text) = self.host.document_line(&uri, line).await? else {
            return Ok(None);
        };

        let Some((start, end)) = word_range(&text, character as usize) else {
            return Ok(None);
        };

        Ok(Some(lsp::Hover {
            contents: lsp::HoverContents::Array(vec![
                lsp::MarkedString::String(HOVER_ACKNOWLEDGMENT.to_string()),
                lsp::MarkedString::LanguageString(lsp::LanguageString {
                    language: LANGUAGE_ID.to_string(),
                    value: text,
                }),
            ]),
            range: Some(lsp::Range::new(
                lsp::Position::new(line, start as u32),
                lsp::Position::new(line, end as u32),
            )),
        }))
    }
}

impl<H: Host> JsonnetPlugin<H> {
    /// Relays the content changes to the host until the plugin is dropped.
    ///
    /// The subscription is taken before this returns, no change announced
    /// afterwards is missed.
    pub fn forward_changes(self: &Arc<Self>) -> JoinHandle<()> {
        let mut changes = self.provider.subscribe();
        let plugin = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(uri) => {
                        let Some(plugin) = plugin.upgrade() else {
                            break;
                        };
                        if let Err(err) = plugin.host.preview_did_change(&uri) {
                            tracing::error!(?err, %uri, "Failed to notify preview change");
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Preview changes lagged behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

/// Host-backed workspace handed to the content provider.
struct HostWorkspace<'a, H> {
    host: &'a H,
    base_config: &'a PreviewConfig,
}

#[async_trait::async_trait]
impl<H: Host> Workspace for HostWorkspace<'_, H> {
    type Error = anyhow::Error;

    async fn open_document(&self, uri: &str) -> Result<Document> {
        self.host.open_document(uri).await
    }

    async fn preview_config(&self) -> Result<PreviewConfig> {
        let settings = self.host.settings().await?;
        Ok(self.base_config.with_host_settings(settings))
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Returns the character range of the word touching `character`.
fn word_range(line: &str, character: usize) -> Option<(usize, usize)> {
    let chars = line.chars().collect::<Vec<_>>();

    let on_word = |i: usize| chars.get(i).copied().is_some_and(is_word_char);

    let anchor = if on_word(character) {
        character
    } else if character > 0 && on_word(character - 1) {
        character - 1
    } else {
        return None;
    };

    let start = chars[..anchor]
        .iter()
        .rposition(|c| !is_word_char(*c))
        .map_or(0, |i| i + 1);
    let end = chars[anchor..]
        .iter()
        .position(|c| !is_word_char(*c))
        .map_or(chars.len(), |i| anchor + i);

    Some((start, end))
}
