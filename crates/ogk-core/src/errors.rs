use std::time::Duration;

/// Boxed underlying cause carried by transport-level errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core error type.
///
/// Adapter crates map their library errors into these variants so the run
/// collector can tell a portal that changed its page layout apart from one
/// that timed out, and both apart from a messenger that refused a message.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("embedded payload `{marker} = {{...}}` not found in portal response")]
    PayloadNotFound { marker: String },

    #[error("failed to parse embedded payload as JSON: {0}")]
    PayloadParse(#[source] serde_json::Error),

    #[error("invalid portal record: {0}")]
    InvalidRecord(String),

    #[error("request to {url} timed out after {secs}s: {source}", secs = .timeout.as_secs())]
    RequestTimeout {
        url: String,
        timeout: Duration,
        #[source]
        source: BoxError,
    },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("messenger rejected message ({code}): {description}")]
    DeliveryRejected { code: String, description: String },

    #[error("delivery network error: {source}")]
    DeliveryNetwork {
        #[source]
        source: BoxError,
    },
}

impl Error {
    /// The portal answered, but not with something we can read.
    pub fn is_malformed_payload(&self) -> bool {
        matches!(
            self,
            Error::PayloadNotFound { .. } | Error::PayloadParse(_) | Error::InvalidRecord(_)
        )
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::RequestTimeout { .. } | Error::Request { .. })
    }

    pub fn is_delivery(&self) -> bool {
        matches!(
            self,
            Error::DeliveryRejected { .. } | Error::DeliveryNetwork { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
