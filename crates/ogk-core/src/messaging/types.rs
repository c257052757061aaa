use crate::domain::{ChatTarget, MessageId};

/// Capabilities / limits of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    /// Hard ceiling per message, in characters.
    pub max_message_len: usize,
}

/// A delivered message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRef {
    pub chat: ChatTarget,
    pub message_id: MessageId,
}
