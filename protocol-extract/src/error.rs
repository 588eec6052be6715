use thiserror::Error;

/// Errors surfaced by document extraction and the generation boundary.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("document rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("generation service call failed: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Why an uploaded document was refused before any model call was made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported mime type `{0}`, expected application/pdf")]
    UnsupportedMimeType(String),

    #[error("document is empty")]
    EmptyDocument,

    #[error("document does not start with a PDF header")]
    NotPdf,
}

/// A single JSON-bearing section that failed to deserialize.
///
/// Never returned from the extraction API: the parser logs it and falls back
/// to the field's empty default.
#[derive(Debug, Error)]
#[error("section `{field}` carried malformed JSON: {source}")]
pub struct MalformedFieldError {
    pub field: &'static str,
    #[source]
    pub source: serde_json::Error,
}

impl From<reqwest::Error> for ExtractError {
    fn from(err: reqwest::Error) -> Self {
        ExtractError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
