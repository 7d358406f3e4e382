//! 内存聊天传输（用于测试，无需 Discord）
//!
//! 模拟服务端频道：push 进来的消息按 after / limit 返回，发送的回复被记录下来供断言。
//! 可以让指定频道的 list 调用失败，以测试轮询的故障隔离。

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ChatMessage, ChatTransport, MessageId, OperatorNotifier};
use crate::core::BotError;

#[derive(Default)]
struct Inner {
    channels: HashMap<String, Vec<ChatMessage>>,
    sent: Vec<(String, String)>,
    failing: HashSet<String>,
    list_calls: Vec<(String, Option<MessageId>, u32)>,
}

#[derive(Default)]
pub struct RecordingChat {
    inner: Mutex<Inner>,
}

impl RecordingChat {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// 追加一条频道消息（保持插入顺序，不排序）
    pub fn push(&self, channel_id: &str, message: ChatMessage) {
        self.lock()
            .channels
            .entry(channel_id.to_string())
            .or_default()
            .push(message);
    }

    /// 便捷构造：来自 guild 内普通用户的消息
    pub fn push_user(&self, channel_id: &str, id: u64, author_id: &str, guild_id: &str, content: &str) {
        self.push(
            channel_id,
            ChatMessage {
                id: MessageId(id),
                author_id: author_id.to_string(),
                is_bot: false,
                guild_id: Some(guild_id.to_string()),
                content: content.to_string(),
            },
        );
    }

    pub fn set_failing(&self, channel_id: &str, failing: bool) {
        let mut inner = self.lock();
        if failing {
            inner.failing.insert(channel_id.to_string());
        } else {
            inner.failing.remove(channel_id);
        }
    }

    /// 全部已发送的 (channel, content)
    pub fn sent(&self) -> Vec<(String, String)> {
        self.lock().sent.clone()
    }

    /// 指定频道已发送的内容
    pub fn sent_to(&self, channel_id: &str) -> Vec<String> {
        self.lock()
            .sent
            .iter()
            .filter(|(c, _)| c == channel_id)
            .map(|(_, content)| content.clone())
            .collect()
    }

    pub fn clear_sent(&self) {
        self.lock().sent.clear();
    }

    /// list_messages 的调用记录 (channel, after, limit)
    pub fn list_calls(&self) -> Vec<(String, Option<MessageId>, u32)> {
        self.lock().list_calls.clone()
    }
}

#[async_trait]
impl ChatTransport for RecordingChat {
    async fn list_messages(
        &self,
        channel_id: &str,
        after: Option<MessageId>,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, BotError> {
        let mut inner = self.lock();
        inner
            .list_calls
            .push((channel_id.to_string(), after, limit));
        if inner.failing.contains(channel_id) {
            return Err(BotError::chat(503, "service unavailable"));
        }

        let all = inner.channels.get(channel_id).cloned().unwrap_or_default();
        let mut messages: Vec<ChatMessage> = match after {
            Some(after) => all.into_iter().filter(|m| m.id > after).collect(),
            None => {
                // 与 Discord 一致：无游标时返回最新的若干条（新 -> 旧）
                let mut newest = all;
                newest.sort_by(|a, b| b.id.cmp(&a.id));
                newest
            }
        };
        messages.truncate(limit as usize);
        Ok(messages)
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), BotError> {
        self.lock()
            .sent
            .push((channel_id.to_string(), content.to_string()));
        Ok(())
    }
}

/// 记录运维通知
#[derive(Default)]
pub struct RecordingNotifier {
    notes: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notes(&self) -> Vec<String> {
        self.notes.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl OperatorNotifier for RecordingNotifier {
    async fn notify(&self, content: &str) {
        self.notes
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(content.to_string());
    }
}
