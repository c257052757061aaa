use std::time::Duration;

use async_trait::async_trait;

use crate::{
    domain::{DateRange, Document},
    errors::BoxError,
};

/// A form-encoded POST request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub form: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level failure, classified by the adapter.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("timed out: {0}")]
    Timeout(#[source] BoxError),

    #[error("{0}")]
    Other(#[source] BoxError),
}

/// Hexagonal port for outbound HTTP.
///
/// The portal client only needs "send a form, get status + body back, or tell me
/// it timed out", so adapters (reqwest today) stay thin and tests can swap in a
/// scripted fake.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_form(&self, req: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Anything that can list an agency's disclosures over a date range.
///
/// Implemented by the portal client; the run collector only sees this trait.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(
        &self,
        agency_code: &str,
        agency_name: &str,
        range: &DateRange,
    ) -> crate::Result<Vec<Document>>;
}
