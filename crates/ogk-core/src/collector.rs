//! One run: fetch every agency, tolerate per-agency failures, deliver one digest.

use tracing::{error, info, warn};

use crate::{
    config::RunOptions,
    domain::{Agency, AgencyResult, DateRange},
    errors::Error,
    messaging::chunked::{ChunkedSender, DeliveryReport},
    ports::DocumentSource,
};

#[derive(Debug)]
pub struct AgencyFailure {
    pub agency: Agency,
    pub error: Error,
}

/// Per-agency results of the fetch phase, in configured order.
#[derive(Debug, Default)]
pub struct Collected {
    pub results: Vec<AgencyResult>,
    pub failures: Vec<AgencyFailure>,
}

impl Collected {
    pub fn total_documents(&self) -> usize {
        self.results.iter().map(|r| r.documents.len()).sum()
    }
}

/// Fetch agencies one after another.
///
/// A failing agency is logged with its name and code and left out of
/// `results`; the rest of the list is still processed.
pub async fn collect(
    source: &dyn DocumentSource,
    agencies: &[Agency],
    range: &DateRange,
) -> Collected {
    let mut collected = Collected::default();

    for agency in agencies {
        info!(agency = %agency.name, code = %agency.code, "processing agency");

        match source.fetch(&agency.code, &agency.name, range).await {
            Ok(documents) => {
                info!(agency = %agency.name, count = documents.len(), "agency fetched");
                collected
                    .results
                    .push(AgencyResult::new(agency.name.clone(), documents));
            }
            Err(e) => {
                error!(
                    agency = %agency.name,
                    code = %agency.code,
                    error = %e,
                    "agency fetch failed"
                );
                collected.failures.push(AgencyFailure {
                    agency: agency.clone(),
                    error: e,
                });
            }
        }
    }

    collected
}

#[derive(Debug)]
pub struct RunReport {
    pub collected: Collected,
    /// `None` when delivery was skipped.
    pub delivery: Option<DeliveryReport>,
}

impl RunReport {
    /// False when any agency failed or any chunk was not delivered.
    pub fn success(&self) -> bool {
        self.collected.failures.is_empty()
            && self.delivery.as_ref().map_or(true, DeliveryReport::success)
    }
}

/// Fetch, format and deliver for one date range.
pub async fn run(
    source: &dyn DocumentSource,
    sender: &ChunkedSender,
    agencies: &[Agency],
    range: &DateRange,
    opts: RunOptions,
) -> RunReport {
    let label = range.label();
    info!(range = %label, agencies = agencies.len(), "starting run");

    let collected = collect(source, agencies, range).await;
    let total = collected.total_documents();

    if !collected.failures.is_empty() {
        warn!(
            failed = collected.failures.len(),
            succeeded = collected.results.len(),
            "some agencies failed; delivering what was fetched"
        );
    }

    if total == 0 && opts.quiet_when_empty {
        info!(range = %label, "no documents published; notification suppressed");
        return RunReport {
            collected,
            delivery: None,
        };
    }

    let delivery = sender.send(&collected.results, &label).await;
    if delivery.success() {
        info!(documents = total, chunks = delivery.chunks, "digest delivered");
    } else {
        error!(
            failed_chunks = delivery.failures.len(),
            chunks = delivery.chunks,
            "digest delivery incomplete"
        );
    }

    RunReport {
        collected,
        delivery: Some(delivery),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::PortalConfig,
        domain::{ChatTarget, Document, MessageId},
        messaging::{
            port::MessagingPort,
            types::{MessageRef, MessagingCapabilities},
        },
        portal::PortalClient,
        ports::{HttpRequest, HttpResponse, HttpTransport, TransportError},
        Result,
    };
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::{Arc, Mutex};

    struct FakeSource {
        fail_codes: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn new(fail_codes: Vec<&'static str>) -> Self {
            Self {
                fail_codes,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DocumentSource for FakeSource {
        async fn fetch(
            &self,
            agency_code: &str,
            agency_name: &str,
            range: &DateRange,
        ) -> Result<Vec<Document>> {
            self.calls.lock().unwrap().push(agency_code.to_string());
            if self.fail_codes.iter().any(|c| *c == agency_code) {
                return Err(Error::Request {
                    url: "https://portal".to_string(),
                    source: "API failure".into(),
                });
            }
            Ok(vec![Document {
                title: "문서".to_string(),
                produced_at: range.start.and_hms_opt(0, 0, 0).unwrap(),
                agency_name: agency_name.to_string(),
                url: String::new(),
            }])
        }
    }

    #[derive(Default)]
    struct FakeMessenger {
        fail: bool,
        sends: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities {
                max_message_len: 4096,
            }
        }

        async fn send_markdown(&self, chat: &ChatTarget, text: &str) -> Result<MessageRef> {
            if self.fail {
                return Err(Error::DeliveryNetwork {
                    source: "notifier failed".into(),
                });
            }
            self.sends.lock().unwrap().push(text.to_string());
            Ok(MessageRef {
                chat: chat.clone(),
                message_id: MessageId(1),
            })
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, d).unwrap()
    }

    fn agencies(n: usize) -> Vec<Agency> {
        (1..=n)
            .map(|i| Agency::new(format!("A{i}"), format!("기관{i}")))
            .collect()
    }

    #[tokio::test]
    async fn failed_agency_is_excluded_and_rest_continue() {
        let source = FakeSource::new(vec!["A2"]);
        let collected = collect(&source, &agencies(3), &DateRange::single(day(2))).await;

        assert_eq!(*source.calls.lock().unwrap(), vec!["A1", "A2", "A3"]);
        let names: Vec<&str> = collected
            .results
            .iter()
            .map(|r| r.agency_name.as_str())
            .collect();
        assert_eq!(names, vec!["기관1", "기관3"]);
        assert_eq!(collected.failures.len(), 1);
        assert_eq!(collected.failures[0].agency.code, "A2");
    }

    #[tokio::test]
    async fn partial_failure_still_delivers_but_run_fails() {
        let source = FakeSource::new(vec!["A2"]);
        let messenger = Arc::new(FakeMessenger::default());
        let sender = ChunkedSender::new(messenger.clone(), ChatTarget::Id(1));

        let report = run(
            &source,
            &sender,
            &agencies(3),
            &DateRange::single(day(2)),
            RunOptions::default(),
        )
        .await;

        assert!(!report.success());
        assert!(report.delivery.as_ref().unwrap().success());
        let sends = messenger.sends.lock().unwrap();
        assert_eq!(sends.len(), 1);
        assert!(sends[0].contains("기관1") && sends[0].contains("기관3"));
        assert!(!sends[0].contains("기관2"));
        // Failed agencies are not counted among the agencies reported on.
        assert!(sends[0].contains("2개 부서 중 2개 부서, 총 2건"));
    }

    #[tokio::test]
    async fn delivery_failure_fails_run() {
        let source = FakeSource::new(vec![]);
        let messenger = Arc::new(FakeMessenger {
            fail: true,
            ..Default::default()
        });
        let sender = ChunkedSender::new(messenger, ChatTarget::Id(1));

        let report = run(
            &source,
            &sender,
            &agencies(1),
            &DateRange::single(day(2)),
            RunOptions::default(),
        )
        .await;

        assert!(report.collected.failures.is_empty());
        assert!(!report.success());
    }

    #[tokio::test]
    async fn all_empty_sends_notice_unless_quiet() {
        struct Empty;

        #[async_trait]
        impl DocumentSource for Empty {
            async fn fetch(&self, _: &str, _: &str, _: &DateRange) -> Result<Vec<Document>> {
                Ok(vec![])
            }
        }

        let messenger = Arc::new(FakeMessenger::default());
        let sender = ChunkedSender::new(messenger.clone(), ChatTarget::Id(1));
        let range = DateRange::single(day(2));

        let default = run(&Empty, &sender, &agencies(2), &range, RunOptions::default()).await;
        assert!(default.success());
        assert!(default.delivery.is_some());
        {
            let sends = messenger.sends.lock().unwrap();
            assert_eq!(sends.len(), 1);
            assert!(sends[0].contains("2026\\-02\\-02"));
            assert!(sends[0].contains("공개된 문서가 없습니다"));
        }

        let quiet = run(
            &Empty,
            &sender,
            &agencies(2),
            &range,
            RunOptions {
                quiet_when_empty: true,
            },
        )
        .await;
        assert!(quiet.success());
        assert!(quiet.delivery.is_none());
        assert_eq!(messenger.sends.lock().unwrap().len(), 1);
    }

    /// Serves a canned list page per agency code.
    struct PortalStub;

    #[async_trait]
    impl HttpTransport for PortalStub {
        async fn post_form(
            &self,
            req: &HttpRequest,
        ) -> std::result::Result<HttpResponse, TransportError> {
            let code = req
                .form
                .iter()
                .find(|(k, _)| k == "insttCd")
                .map(|(_, v)| v.as_str())
                .unwrap_or_default();
            let payload = match code {
                "1342000" => serde_json::json!({
                    "rtnList": [
                        {
                            "INFO_SJ": "2024년 교육정책 보고서",
                            "PRDCTN_DT": "20251227120000",
                            "PROC_INSTT_NM": "교육부",
                            "PRDCTN_INSTT_REGIST_NO": "DCT88209A2A1A26554804C2D0F2F351816D",
                            "INSTT_SE_CD": "C"
                        },
                        {
                            "INFO_SJ": "학교 시설 관리 지침",
                            "PRDCTN_DT": "20251228140000",
                            "PROC_INSTT_NM": "교육부",
                            "PRDCTN_INSTT_REGIST_NO": "DCT768E063D7947E73B2F16E1C2EC093A5B",
                            "INSTT_SE_CD": "C"
                        }
                    ],
                    "rtnTotal": 2
                }),
                _ => serde_json::json!({ "rtnList": [], "rtnTotal": 0 }),
            };
            Ok(HttpResponse {
                status: 200,
                body: format!("<html><script>\nvar result = {payload};\n</script></html>"),
            })
        }
    }

    #[tokio::test]
    async fn end_to_end_two_agencies_one_with_documents() {
        let client = PortalClient::new(PortalConfig::default(), Arc::new(PortalStub)).unwrap();
        let messenger = Arc::new(FakeMessenger::default());
        let sender = ChunkedSender::new(messenger.clone(), ChatTarget::Id(-1001234567890));
        let agencies = vec![
            Agency::new("1342000", "교육부"),
            Agency::new("1741000", "행정안전부"),
        ];
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 12, 27).unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 28).unwrap(),
        )
        .unwrap();

        let report = run(&client, &sender, &agencies, &range, RunOptions::default()).await;

        assert!(report.success());
        let sends = messenger.sends.lock().unwrap();
        assert_eq!(sends.len(), 1);
        let digest = &sends[0];
        assert!(digest.contains("2025\\-12\\-27 \\~ 2025\\-12\\-28"));
        assert!(digest.contains("2개 부서 중 1개 부서, 총 2건"));
        assert!(digest.contains("🏛 *교육부* \\(2건\\)"));
        assert!(digest.contains("1\\. [2024년 교육정책 보고서]("));
        assert!(digest.contains("2\\. [학교 시설 관리 지침]("));
        assert!(!digest.contains("행정안전부"));
    }
}
