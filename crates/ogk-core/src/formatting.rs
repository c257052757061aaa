//! Digest formatting (Telegram MarkdownV2).

use crate::domain::{AgencyResult, Document};

/// Every character MarkdownV2 treats as syntax outside code spans.
pub const MARKDOWN_V2_SPECIAL: &[char] = &[
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

pub const DIGEST_TITLE: &str = "원문정보 공개 알림";
pub const NO_DOCUMENTS: &str = "공개된 문서가 없습니다";

/// Escape text for MarkdownV2: each special character gets a leading backslash.
///
/// Text without special characters comes back unchanged.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_V2_SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a link target for the `(...)` part of an inline link.
///
/// Inside the parentheses only `)` and `\` are significant.
pub fn escape_link_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for c in url.chars() {
        if c == ')' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn header(date_label: &str) -> String {
    format!(
        "📋 *{} \\({}\\)*",
        escape_markdown(DIGEST_TITLE),
        escape_markdown(date_label)
    )
}

fn document_line(index: usize, doc: &Document) -> String {
    let title = escape_markdown(&doc.title);
    if doc.has_url() {
        return format!("{index}\\. [{title}]({})", escape_link_url(doc.url.trim()));
    }
    format!("{index}\\. {title}")
}

/// Render the whole digest for one run.
///
/// Agencies keep their input order; agencies without documents contribute no
/// section and are not counted as "with documents". The first count in the
/// header is `results.len()`, so agencies whose fetch failed (and were left
/// out by the caller) are not included in it. With nothing to report the
/// fixed no-documents message is returned (still dated).
pub fn format_digest(results: &[AgencyResult], date_label: &str) -> String {
    let total: usize = results.iter().map(|r| r.documents.len()).sum();
    if total == 0 {
        return format!("{}\n\n{}\\.", header(date_label), NO_DOCUMENTS);
    }

    let non_empty: Vec<&AgencyResult> = results
        .iter()
        .filter(|r| !r.documents.is_empty())
        .collect();

    let mut out = header(date_label);
    out.push('\n');
    out.push_str(&format!(
        "{}개 부서 중 {}개 부서, 총 {total}건",
        results.len(),
        non_empty.len()
    ));

    for result in non_empty {
        out.push_str("\n\n");
        out.push_str(&format!(
            "🏛 *{}* \\({}건\\)",
            escape_markdown(&result.agency_name),
            result.documents.len()
        ));
        for (i, doc) in result.documents.iter().enumerate() {
            out.push('\n');
            out.push_str(&document_line(i + 1, doc));
        }
    }

    out
}
