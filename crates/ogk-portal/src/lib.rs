//! HTTP adapter (reqwest).
//!
//! Implements the `ogk-core` HttpTransport port for the disclosure portal.

use async_trait::async_trait;
use tracing::debug;

use ogk_core::{
    errors::Error,
    ports::{HttpRequest, HttpResponse, HttpTransport, TransportError},
    Result,
};

const USER_AGENT: &str = concat!("ogk/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Config(format!("http client build failed: {e}")))?;
        Ok(Self { http })
    }

    fn classify(e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(Box::new(e))
        } else {
            TransportError::Other(Box::new(e))
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_form(
        &self,
        req: &HttpRequest,
    ) -> std::result::Result<HttpResponse, TransportError> {
        let mut builder = self
            .http
            .post(&req.url)
            .timeout(req.timeout)
            .form(&req.form);
        for (k, v) in &req.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }

        let resp = builder.send().await.map_err(Self::classify)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(Self::classify)?;
        debug!(url = %req.url, status, bytes = body.len(), "portal response");

        Ok(HttpResponse { status, body })
    }
}
