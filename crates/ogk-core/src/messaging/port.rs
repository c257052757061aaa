use async_trait::async_trait;

use crate::{
    domain::ChatTarget,
    messaging::types::{MessageRef, MessagingCapabilities},
    Result,
};

/// Messenger port.
///
/// Implementations send one already-formatted MarkdownV2 message and map their
/// failures to `Error::DeliveryRejected` (the API said no) or
/// `Error::DeliveryNetwork` (we never got a proper answer).
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_markdown(&self, chat: &ChatTarget, text: &str) -> Result<MessageRef>;
}
