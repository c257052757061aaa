use std::sync::Arc;

use tracing::{error, info};

use crate::{
    domain::{AgencyResult, ChatTarget},
    errors::Error,
    formatting::format_digest,
    messaging::{port::MessagingPort, types::MessageRef},
};

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[derive(Default)]
struct ChunkBuilder {
    lines: Vec<String>,
    len: usize,
}

impl ChunkBuilder {
    fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn len_with(&self, line_len: usize) -> usize {
        if self.lines.is_empty() {
            line_len
        } else {
            self.len + 1 + line_len
        }
    }

    fn push(&mut self, line: String, line_len: usize) {
        self.len = self.len_with(line_len);
        self.lines.push(line);
    }

    /// Emit the pending chunk, dropping blank lines at its tail.
    fn flush(&mut self, out: &mut Vec<String>) {
        while self.lines.last().is_some_and(|l| l.trim().is_empty()) {
            self.lines.pop();
        }
        if !self.lines.is_empty() {
            out.push(self.lines.join("\n"));
        }
        self.lines.clear();
        self.len = 0;
    }
}

/// Cut an over-long line into pieces of at most `max_len` characters.
///
/// A cut never separates a MarkdownV2 escape backslash from the character it
/// escapes; such a piece gives up its trailing backslash to the next one.
fn hard_split(line: &str, max_len: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut pieces = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let mut end = (start + max_len).min(chars.len());
        if end < chars.len() {
            let trailing = chars[start..end]
                .iter()
                .rev()
                .take_while(|c| **c == '\\')
                .count();
            if trailing % 2 == 1 && end - start > 1 {
                end -= 1;
            }
        }
        pieces.push(chars[start..end].iter().collect());
        start = end;
    }
    pieces
}

/// Split `text` into ordered chunks of at most `max_len` characters.
///
/// Splits only happen between lines, so a numbered entry or link is never cut
/// in half. Blank lines falling on a chunk boundary are dropped. A single line
/// longer than `max_len` is the one exception: it is hard-split into pieces.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(2);
    if char_len(text) <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut cur = ChunkBuilder::default();

    for line in text.split('\n') {
        let line_len = char_len(line);

        if line_len > max_len {
            cur.flush(&mut chunks);
            let mut pieces = hard_split(line, max_len);
            let tail = pieces.pop();
            chunks.extend(pieces);
            if let Some(tail) = tail {
                let tail_len = char_len(&tail);
                cur.push(tail, tail_len);
            }
            continue;
        }

        if cur.len_with(line_len) > max_len {
            cur.flush(&mut chunks);
        }
        if cur.is_empty() && line.trim().is_empty() {
            continue;
        }
        cur.push(line.to_string(), line_len);
    }
    cur.flush(&mut chunks);

    chunks
}

#[derive(Debug)]
pub struct ChunkFailure {
    /// 0-based chunk index.
    pub index: usize,
    pub error: Error,
}

/// Outcome of delivering one digest.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub chunks: usize,
    pub delivered: Vec<MessageRef>,
    pub failures: Vec<ChunkFailure>,
}

impl DeliveryReport {
    /// True iff every chunk went through.
    pub fn success(&self) -> bool {
        self.failures.is_empty() && self.delivered.len() == self.chunks
    }
}

/// Delivers a digest through a [`MessagingPort`], splitting it when it exceeds
/// the messenger's size ceiling.
pub struct ChunkedSender {
    inner: Arc<dyn MessagingPort>,
    chat: ChatTarget,
    max_len: usize,
}

impl ChunkedSender {
    pub fn new(inner: Arc<dyn MessagingPort>, chat: ChatTarget) -> Self {
        let max_len = inner.capabilities().max_message_len;
        Self {
            inner,
            chat,
            max_len,
        }
    }

    /// Lower the ceiling below what the messenger advertises.
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len.min(self.inner.capabilities().max_message_len);
        self
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Format the digest and deliver it.
    pub async fn send(&self, results: &[AgencyResult], date_label: &str) -> DeliveryReport {
        let digest = format_digest(results, date_label);
        self.deliver(&digest).await
    }

    /// Deliver `text`, chunk by chunk, strictly in order.
    ///
    /// A failed chunk is logged and recorded; the remaining chunks are still
    /// attempted and the report comes back unsuccessful.
    pub async fn deliver(&self, text: &str) -> DeliveryReport {
        let chunks = split_message(text, self.max_len);
        let total = chunks.len();
        let mut report = DeliveryReport {
            chunks: total,
            ..DeliveryReport::default()
        };

        if total > 1 {
            info!(chunks = total, max_len = self.max_len, "digest split into chunks");
        }

        for (index, chunk) in chunks.iter().enumerate() {
            match self.inner.send_markdown(&self.chat, chunk).await {
                Ok(msg) => report.delivered.push(msg),
                Err(e) => {
                    error!(chunk = index + 1, of = total, error = %e, "chunk delivery failed");
                    report.failures.push(ChunkFailure { index, error: e });
                }
            }
        }

        report
    }
}
