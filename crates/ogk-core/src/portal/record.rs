//! Portal record → `Document` mapping.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::{config::PortalConfig, domain::Document, errors::Error, Result};

/// Read a scalar field as text. Numbers are accepted because the portal is not
/// consistent about quoting numeric-looking identifiers.
pub(crate) fn field_str(item: &Value, key: &str) -> Option<String> {
    match item.get(key)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse the portal's compact `YYYYMMDDHHMMSS` timestamp.
///
/// Only the date part is mandatory; missing time fields default to zero, so
/// `20251227` and `202512271200` are both accepted. Separators are ignored.
pub fn parse_compact_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 8 {
        return None;
    }

    let num = |from: usize, len: usize| -> u32 {
        digits
            .iter()
            .skip(from)
            .take(len)
            .fold(0, |acc, d| acc * 10 + d)
    };
    let pair = |from: usize| if digits.len() >= from + 2 { num(from, 2) } else { 0 };

    let date = NaiveDate::from_ymd_opt(num(0, 4) as i32, num(4, 2), num(6, 2))?;
    date.and_hms_opt(pair(8), pair(10), pair(12))
}

/// Detail-page link, or empty when the record has no registration number.
pub fn detail_url(
    cfg: &PortalConfig,
    registration_no: &str,
    produced_at: &str,
    kind: &str,
) -> Result<String> {
    if registration_no.is_empty() {
        return Ok(String::new());
    }

    let mut params = vec![("prdnNstRgstNo", registration_no), ("prdnDt", produced_at)];
    if !kind.is_empty() {
        params.push(("nstSeCd", kind));
    }

    let url = url::Url::parse_with_params(&cfg.detail_url, &params).map_err(|e| {
        Error::Config(format!(
            "invalid portal detail url `{}`: {e}",
            cfg.detail_url
        ))
    })?;
    Ok(url.to_string())
}

/// Map one list entry. `fallback_agency` is used when the record omits the
/// agency name.
pub fn map_record(cfg: &PortalConfig, item: &Value, fallback_agency: &str) -> Result<Document> {
    if !item.is_object() {
        return Err(Error::InvalidRecord(format!("list entry is not an object: {item}")));
    }

    let title = field_str(item, &cfg.title_key)
        .ok_or_else(|| Error::InvalidRecord(format!("missing `{}`", cfg.title_key)))?;

    let raw_produced_at = field_str(item, &cfg.produced_at_key)
        .ok_or_else(|| Error::InvalidRecord(format!("missing `{}`", cfg.produced_at_key)))?;
    let produced_at = parse_compact_timestamp(&raw_produced_at).ok_or_else(|| {
        Error::InvalidRecord(format!(
            "unparseable `{}` value `{raw_produced_at}`",
            cfg.produced_at_key
        ))
    })?;

    let agency_name = field_str(item, &cfg.agency_name_key)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback_agency.to_string());

    let registration_no = field_str(item, &cfg.registration_no_key).unwrap_or_default();
    let kind = field_str(item, &cfg.institution_kind_key).unwrap_or_default();
    let url = detail_url(cfg, &registration_no, &raw_produced_at, &kind)?;

    Ok(Document {
        title,
        produced_at,
        agency_name,
        url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ts(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn parses_full_and_truncated_timestamps() {
        assert_eq!(
            parse_compact_timestamp("20251227093015"),
            Some(ts(2025, 12, 27, 9, 30, 15))
        );
        assert_eq!(
            parse_compact_timestamp("202512271200"),
            Some(ts(2025, 12, 27, 12, 0, 0))
        );
        assert_eq!(
            parse_compact_timestamp("20251227"),
            Some(ts(2025, 12, 27, 0, 0, 0))
        );
        assert_eq!(
            parse_compact_timestamp("2025-12-27"),
            Some(ts(2025, 12, 27, 0, 0, 0))
        );
        assert_eq!(parse_compact_timestamp("202512"), None);
        assert_eq!(parse_compact_timestamp("20251341"), None);
    }

    #[test]
    fn maps_record_with_detail_url() {
        let cfg = PortalConfig::default();
        let item = json!({
            "INFO_SJ": "AI 정책 백서 2025",
            "PRDCTN_DT": "20251227093015",
            "PROC_INSTT_NM": "과학기술정보통신부",
            "PRDCTN_INSTT_REGIST_NO": "DCTA8E6643D6E5FB1A6C4E51D3F09BF2B04",
            "INSTT_SE_CD": "C",
        });

        let doc = map_record(&cfg, &item, "과기정통부").unwrap();
        assert_eq!(doc.title, "AI 정책 백서 2025");
        assert_eq!(doc.agency_name, "과학기술정보통신부");
        assert_eq!(doc.produced_at, ts(2025, 12, 27, 9, 30, 15));
        assert!(doc.url.starts_with(&cfg.detail_url));
        assert!(doc.url.contains("prdnNstRgstNo=DCTA8E6643D6E5FB1A6C4E51D3F09BF2B04"));
        assert!(doc.url.contains("prdnDt=20251227093015"));
        assert!(doc.url.contains("nstSeCd=C"));
    }

    #[test]
    fn record_without_identifier_has_empty_url() {
        let cfg = PortalConfig::default();
        let item = json!({"INFO_SJ": "문서", "PRDCTN_DT": 20251227});

        let doc = map_record(&cfg, &item, "교육부").unwrap();
        assert_eq!(doc.url, "");
        assert!(!doc.has_url());
        assert_eq!(doc.agency_name, "교육부");
    }

    #[test]
    fn missing_title_or_bad_timestamp_is_invalid_record() {
        let cfg = PortalConfig::default();

        let err = map_record(&cfg, &json!({"PRDCTN_DT": "20251227"}), "x").unwrap_err();
        assert!(matches!(err, Error::InvalidRecord(ref m) if m.contains("INFO_SJ")));

        let err = map_record(&cfg, &json!({"INFO_SJ": "t", "PRDCTN_DT": "soon"}), "x").unwrap_err();
        assert!(matches!(err, Error::InvalidRecord(_)));

        let err = map_record(&cfg, &json!("just a string"), "x").unwrap_err();
        assert!(matches!(err, Error::InvalidRecord(_)));
    }
}
