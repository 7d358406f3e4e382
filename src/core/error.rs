//! 错误类型与截断工具
//!
//! 传输层（Discord / 后端 / Webhook）错误在边界处转换为 BotError，不会进入状态机；
//! 面向用户的错误文本统一经过 truncate_chars 截断。

use thiserror::Error;

/// 传输错误体最多保留的字符数
pub const ERROR_BODY_MAX_CHARS: usize = 500;

/// Beacon 运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Discord API {status}: {body}")]
    Chat { status: u16, body: String },

    #[error("API {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// 既没有配置频道 ID，也没有在 guild 中找到允许的频道名
    #[error("No channels to poll: set discord.channel_ids or discord.allowed_channel_names")]
    NoChannels,
}

impl BotError {
    /// 构造 Discord 非成功状态错误（响应体截断）
    pub fn chat(status: u16, body: &str) -> Self {
        Self::Chat {
            status,
            body: truncate_chars(body, ERROR_BODY_MAX_CHARS),
        }
    }

    /// 构造后端非成功状态错误（响应体截断）
    pub fn backend(status: u16, body: &str) -> Self {
        Self::Backend {
            status,
            body: truncate_chars(body, ERROR_BODY_MAX_CHARS),
        }
    }
}

/// 按字符（而非字节）截断，保证不会切在 UTF-8 边界中间
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
