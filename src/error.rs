use thiserror::Error;

/// Errors surfaced by the few fallible entry points of the crate.
///
/// The translation functions themselves never fail; these cover decoding a raw
/// request body and encoding outbound JSON.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid chat completion request: {0}")]
    InvalidRequest(#[source] serde_json::Error),

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
