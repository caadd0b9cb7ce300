//! Host-agnostic core of the Jsonnet previewer.
//!
//! # Modules
//!
//! - [`uri`] - Preview identity derived from a source document location
//! - [`settings`] - Resolution of the compiler and its command line
//! - [`process`] - Execution of the external compiler
//! - [`render`] - Formatting of the compiler output into preview documents
//! - [`html`] - HTML templates of the preview documents
//! - [`provider`] - Content provider serving previews and change notifications

pub mod html;
pub mod process;
pub mod provider;
pub mod render;
pub mod settings;
pub mod uri;

pub use jsonnet_config::{OutputFormat, PreviewConfig};
pub use provider::{ContentProvider, Document, Workspace};
pub use render::{format_output, render_file, RenderError};
pub use settings::{ConfigError, Platform, RenderConfig};
pub use uri::{PreviewUri, UriError};

#[cfg(test)]
pub(crate) mod stub;
