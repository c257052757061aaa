//! Telegram adapter (teloxide).
//!
//! This crate implements the `ogk-core` MessagingPort over Telegram Bot API.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{ParseMode, Recipient},
};

use tokio::time::sleep;
use tracing::warn;

use ogk_core::{
    domain::{ChatTarget, MessageId},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{MessageRef, MessagingCapabilities},
    },
    Result,
};

pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn from_token(token: impl Into<String>) -> Self {
        Self::new(Bot::new(token))
    }

    fn recipient(chat: &ChatTarget) -> Recipient {
        match chat {
            ChatTarget::Id(id) => Recipient::Id(teloxide::types::ChatId(*id)),
            ChatTarget::Username(name) => Recipient::ChannelUsername(name.clone()),
        }
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        match e {
            teloxide::RequestError::Api(api) => Error::DeliveryRejected {
                code: format!("{api:?}"),
                description: api.to_string(),
            },
            teloxide::RequestError::MigrateToChatId(new_id) => Error::DeliveryRejected {
                code: "MigrateToChatId".to_string(),
                description: format!("group moved; use chat id {new_id}"),
            },
            teloxide::RequestError::RetryAfter(d) => Error::DeliveryRejected {
                code: "RetryAfter".to_string(),
                description: format!("flood control, retry after {}s", d.as_secs()),
            },
            other => Error::DeliveryNetwork {
                source: Box::new(other),
            },
        }
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        warn!(wait_secs = d.as_secs(), "telegram flood control; retrying once");
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: TELEGRAM_MAX_MESSAGE_LEN,
        }
    }

    async fn send_markdown(&self, chat: &ChatTarget, text: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::recipient(chat), text.to_string())
                    .parse_mode(ParseMode::MarkdownV2)
                    .disable_web_page_preview(true)
            })
            .await?;

        Ok(MessageRef {
            chat: chat.clone(),
            message_id: MessageId(msg.id.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::ApiError;

    #[test]
    fn maps_chat_targets_to_recipients() {
        assert_eq!(
            TelegramMessenger::recipient(&ChatTarget::Id(-1001234567890)),
            Recipient::Id(teloxide::types::ChatId(-1001234567890))
        );
        assert_eq!(
            TelegramMessenger::recipient(&ChatTarget::Username("@disclosures".to_string())),
            Recipient::ChannelUsername("@disclosures".to_string())
        );
    }

    #[test]
    fn api_refusal_is_a_rejection() {
        let err = TelegramMessenger::map_err(teloxide::RequestError::Api(ApiError::BotBlocked));
        assert!(matches!(err, Error::DeliveryRejected { .. }));
        assert!(err.is_delivery());
    }

    #[test]
    fn migrated_group_is_a_rejection_naming_new_chat() {
        let err = TelegramMessenger::map_err(teloxide::RequestError::MigrateToChatId(
            -1009876543210,
        ));
        assert!(matches!(err, Error::DeliveryRejected { .. }));
        assert!(err.to_string().contains("-1009876543210"));
    }

    #[test]
    fn exhausted_flood_wait_is_a_rejection() {
        let err = TelegramMessenger::map_err(teloxide::RequestError::RetryAfter(
            std::time::Duration::from_secs(3),
        ));
        assert!(err.to_string().contains("3s"));
    }

    #[test]
    fn advertises_telegram_limits() {
        let messenger = TelegramMessenger::from_token("123:abc");
        assert_eq!(messenger.capabilities().max_message_len, 4096);
    }
}
