//! 频道水位：每个频道已处理的最大消息 ID（排他下界游标）
//!
//! 只增不减；仅存在内存中，重启后重新预热（priming）。

use std::collections::HashMap;

use crate::chat::MessageId;

#[derive(Debug, Default, Clone)]
pub struct WatermarkTracker {
    marks: HashMap<String, MessageId>,
}

impl WatermarkTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 仅当 message_id 大于当前水位时前移；返回是否前移
    pub fn observe(&mut self, channel_id: &str, message_id: MessageId) -> bool {
        match self.marks.get_mut(channel_id) {
            Some(current) if *current >= message_id => false,
            Some(current) => {
                *current = message_id;
                true
            }
            None => {
                self.marks.insert(channel_id.to_string(), message_id);
                true
            }
        }
    }

    /// 当前水位；未预热或频道为空时为 None
    pub fn cursor_for(&self, channel_id: &str) -> Option<MessageId> {
        self.marks.get(channel_id).copied()
    }
}
