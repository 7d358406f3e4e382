//! 聊天消息与消息 ID
//!
//! Discord 消息 ID 是 snowflake（单调递增的 u64，线上以字符串传输），因此可以直接比较大小作为水位。

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// 全序的消息 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct MessageId(pub u64);

impl FromStr for MessageId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(MessageId)
            .map_err(|e| format!("invalid message id {s:?}: {e}"))
    }
}

impl TryFrom<String> for MessageId {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 传输无关的入站消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub author_id: String,
    pub is_bot: bool,
    pub guild_id: Option<String>,
    pub content: String,
}

impl ChatMessage {
    /// 是否应交给意图解析：非 Bot 作者，且来自指定 guild
    pub fn is_actionable(&self, guild_id: &str) -> bool {
        !self.is_bot && self.guild_id.as_deref() == Some(guild_id)
    }
}
