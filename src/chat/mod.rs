//! 聊天传输层
//!
//! - **ChatTransport**：列出频道消息、发送消息（Discord REST v10 实现见 discord 模块）
//! - **OperatorNotifier**：运维通道（Webhook），只用于启动通告与心跳，失败不影响轮询

mod discord;
mod message;
pub mod mock;
mod webhook;

use async_trait::async_trait;

use crate::core::BotError;

pub use discord::{select_channels, DiscordClient, GuildChannel};
pub use message::{ChatMessage, MessageId};
pub use mock::{RecordingChat, RecordingNotifier};
pub use webhook::WebhookNotifier;

/// 聊天传输接口
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// 列出频道消息；after 为排他下界。返回顺序不做保证，调用方自行排序
    async fn list_messages(
        &self,
        channel_id: &str,
        after: Option<MessageId>,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, BotError>;

    /// 发送消息；实现负责把内容截断到平台上限
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), BotError>;
}

/// 运维通知（尽力而为，不返回错误）
#[async_trait]
pub trait OperatorNotifier: Send + Sync {
    async fn notify(&self, content: &str);
}
