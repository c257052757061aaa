//! open.go.kr original-document list client.
//!
//! One agency at a time: page through the list endpoint, pull the JSON payload
//! out of the returned HTML, and map each entry to a [`Document`].

pub mod extract;
pub mod record;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    config::PortalConfig,
    domain::{DateRange, Document},
    errors::Error,
    ports::{DocumentSource, HttpRequest, HttpTransport, TransportError},
    Result,
};

use extract::PayloadExtractor;

/// One parsed list page.
#[derive(Clone, Debug)]
pub struct Page {
    pub documents: Vec<Document>,
    pub total: Option<u64>,
}

pub struct PortalClient {
    cfg: PortalConfig,
    http: Arc<dyn HttpTransport>,
    extractor: PayloadExtractor,
}

impl PortalClient {
    pub fn new(cfg: PortalConfig, http: Arc<dyn HttpTransport>) -> Result<Self> {
        cfg.validate()?;
        let extractor = PayloadExtractor::new(&cfg.payload_marker)?;
        Ok(Self {
            cfg,
            http,
            extractor,
        })
    }

    /// Fetch every document `agency_code` published inside `range`.
    ///
    /// Pages are requested from 1 upwards. A page shorter than `page_size` is the
    /// last one; so is the page that brings the running count up to the reported
    /// total. No retries: the first failing page fails the whole agency.
    pub async fn fetch_documents(
        &self,
        agency_code: &str,
        agency_name: &str,
        range: &DateRange,
    ) -> Result<Vec<Document>> {
        let page_size = self.cfg.page_size;
        let mut all = Vec::new();
        let mut page = 1usize;

        loop {
            let Page { documents, total } =
                self.fetch_page(agency_code, agency_name, range, page).await?;
            let received = documents.len();
            all.extend(documents);

            debug!(
                agency = agency_name,
                page,
                received,
                collected = all.len(),
                total = ?total,
                "fetched portal page"
            );

            if received < page_size {
                break;
            }
            if let Some(total) = total {
                if all.len() as u64 >= total {
                    break;
                }
            }
            if page >= self.cfg.max_pages {
                warn!(
                    agency = agency_name,
                    max_pages = self.cfg.max_pages,
                    "stopping pagination at page limit"
                );
                break;
            }
            page += 1;
        }

        info!(agency = agency_name, count = all.len(), "fetched documents");
        Ok(all)
    }

    pub async fn fetch_page(
        &self,
        agency_code: &str,
        agency_name: &str,
        range: &DateRange,
        page: usize,
    ) -> Result<Page> {
        let req = self.build_request(agency_code, range, page);

        let resp = match self.http.post_form(&req).await {
            Ok(resp) => resp,
            Err(TransportError::Timeout(source)) => {
                return Err(Error::RequestTimeout {
                    url: req.url,
                    timeout: req.timeout,
                    source,
                })
            }
            Err(TransportError::Other(source)) => {
                return Err(Error::Request {
                    url: req.url,
                    source,
                })
            }
        };

        if !resp.is_success() {
            return Err(Error::Request {
                url: req.url,
                source: format!("unexpected HTTP status {}", resp.status).into(),
            });
        }

        self.parse_page(&resp.body, agency_name)
    }

    /// Extract and map one page body.
    pub fn parse_page(&self, body: &str, agency_name: &str) -> Result<Page> {
        let payload = self.extractor.extract(body)?;

        let list: &[Value] = match payload.get(&self.cfg.list_key) {
            Some(Value::Array(items)) => items.as_slice(),
            Some(Value::Null) => &[],
            None => {
                return Err(Error::InvalidRecord(format!(
                    "missing `{}`",
                    self.cfg.list_key
                )))
            }
            Some(other) => {
                return Err(Error::InvalidRecord(format!(
                    "`{}` is not a list: {other}",
                    self.cfg.list_key
                )))
            }
        };

        let documents = list
            .iter()
            .map(|item| record::map_record(&self.cfg, item, agency_name))
            .collect::<Result<Vec<_>>>()?;

        let total = payload.get(&self.cfg.total_key).and_then(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        });

        Ok(Page { documents, total })
    }

    fn build_request(&self, agency_code: &str, range: &DateRange, page: usize) -> HttpRequest {
        let start = range.start.format("%Y%m%d").to_string();
        let end = range.end.format("%Y%m%d").to_string();
        let list_path = url::Url::parse(&self.cfg.list_url)
            .map(|u| u.path().to_string())
            .unwrap_or_default();

        let form = [
            ("kwd", String::new()),
            ("searchInsttCdNmPop", String::new()),
            ("preKwds", String::new()),
            ("reSrchFlag", "off".to_string()),
            ("othbcSeCd", String::new()),
            ("insttSeCd", String::new()),
            ("eduYn", "N".to_string()),
            ("startDate", start),
            ("endDate", end),
            ("insttCdNm", String::new()),
            ("insttCd", agency_code.to_string()),
            ("searchMainYn", String::new()),
            ("viewPage", page.to_string()),
            ("rowPage", self.cfg.page_size.to_string()),
            ("sort", "s".to_string()),
            ("url", list_path),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let headers = [
            ("Accept", "text/html,application/xhtml+xml,*/*;q=0.8"),
            ("Accept-Language", "ko,en;q=0.9"),
            ("X-Requested-With", "XMLHttpRequest"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        HttpRequest {
            url: self.cfg.list_url.clone(),
            form,
            headers,
            timeout: self.cfg.timeout,
        }
    }
}

#[async_trait]
impl DocumentSource for PortalClient {
    async fn fetch(
        &self,
        agency_code: &str,
        agency_name: &str,
        range: &DateRange,
    ) -> Result<Vec<Document>> {
        self.fetch_documents(agency_code, agency_name, range).await
    }
}
