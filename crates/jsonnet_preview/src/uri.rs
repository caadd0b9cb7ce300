//! Preview identity of a source document.
//!
//! A preview URI is derived from the location of a source document by switching
//! the scheme to [`PREVIEW_SCHEME`] and appending [`PREVIEW_SUFFIX`] to the path.
//! The source location itself travels percent-encoded in the query, so it can be
//! recovered without any stored state.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

pub const PREVIEW_SCHEME: &str = "jsonnet-preview";

pub const PREVIEW_SUFFIX: &str = ".rendered";

/// Everything except the unreserved characters of RFC 3986.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UriError {
    #[error("`{0}` is not a jsonnet-preview uri")]
    NotPreviewUri(String),
    #[error("`{0}` carries no source location")]
    MissingSource(String),
    #[error("source location of `{0}` is not valid UTF-8")]
    InvalidEncoding(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreviewUri(String);

impl PreviewUri {
    /// Derives the preview identity of the source document at `source_uri`.
    pub fn from_source(source_uri: &str) -> Self {
        let without_fragment = source_uri.split('#').next().unwrap_or_default();
        let without_query = without_fragment.split('?').next().unwrap_or_default();

        let hier_part = match without_query.split_once(':') {
            Some((scheme, rest)) if is_scheme(scheme) => rest,
            _ => without_query,
        };

        let query = utf8_percent_encode(source_uri, QUERY_ENCODE_SET);

        Self(format!("{PREVIEW_SCHEME}:{hier_part}{PREVIEW_SUFFIX}?{query}"))
    }

    /// Parses a preview uri sent back by the host.
    pub fn parse(uri: impl Into<String>) -> Result<Self, UriError> {
        let uri = uri.into();
        match uri.split_once(':') {
            Some((PREVIEW_SCHEME, _)) => {}
            _ => return Err(UriError::NotPreviewUri(uri)),
        }
        if !uri.contains('?') {
            return Err(UriError::MissingSource(uri));
        }
        Ok(Self(uri))
    }

    /// Recovers the location of the source document.
    pub fn source(&self) -> Result<String, UriError> {
        let query = self
            .0
            .split_once('?')
            .map(|(_, query)| query)
            .filter(|query| !query.is_empty())
            .ok_or_else(|| UriError::MissingSource(self.0.clone()))?;

        percent_decode_str(query)
            .decode_utf8()
            .map(|source| source.into_owned())
            .map_err(|_| UriError::InvalidEncoding(self.0.clone()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PreviewUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// scheme = ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )
fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
