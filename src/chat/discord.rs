//! Discord REST v10 客户端
//!
//! 使用 Bot Token 轮询频道消息（GET /channels/{id}/messages）并回复（POST 同路径）。
//! 非成功状态统一转换为 BotError::Chat（响应体截断），由轮询循环记录后继续下一个频道。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::{ChatMessage, ChatTransport, MessageId};
use crate::config::DiscordSection;
use crate::core::{truncate_chars, BotError};

/// Discord 文本频道类型
const GUILD_TEXT: u8 = 0;

/// 线上消息结构（只取需要的字段）
#[derive(Debug, Deserialize)]
struct WireMessage {
    id: MessageId,
    #[serde(default)]
    content: String,
    #[serde(default)]
    guild_id: Option<String>,
    #[serde(default)]
    author: WireAuthor,
}

#[derive(Debug, Deserialize, Default)]
struct WireAuthor {
    #[serde(default)]
    id: String,
    #[serde(default)]
    bot: bool,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
}

/// guild 下的频道
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GuildChannel {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: u8,
}

impl From<WireMessage> for ChatMessage {
    fn from(m: WireMessage) -> Self {
        ChatMessage {
            id: m.id,
            author_id: m.author.id,
            is_bot: m.author.bot,
            guild_id: m.guild_id,
            content: m.content,
        }
    }
}

pub struct DiscordClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
    max_message_chars: usize,
}

impl DiscordClient {
    pub fn new(cfg: &DiscordSection) -> Result<Self, BotError> {
        let token = cfg
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| BotError::Config("discord.token is required".to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            token,
            max_message_chars: cfg.max_message_chars,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_base, path))
            .header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.token))
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, BotError> {
        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(BotError::chat(status.as_u16(), &text));
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// 当前 Bot 用户 ID（GET /users/@me）
    pub async fn current_user_id(&self) -> Result<String, BotError> {
        let me: WireUser = self
            .send_json(self.request(Method::GET, "/users/@me"))
            .await?;
        Ok(me.id)
    }

    /// guild 下的全部频道
    pub async fn guild_channels(&self, guild_id: &str) -> Result<Vec<GuildChannel>, BotError> {
        self.send_json(self.request(Method::GET, &format!("/guilds/{}/channels", guild_id)))
            .await
    }

    /// 要轮询的频道：显式配置优先；否则在 guild 中按名称查找文本频道
    pub async fn resolve_channels(&self, cfg: &DiscordSection) -> Result<Vec<String>, BotError> {
        if !cfg.channel_ids.is_empty() {
            return Ok(cfg.channel_ids.clone());
        }
        let guild_id = cfg
            .guild_id
            .as_deref()
            .ok_or_else(|| BotError::Config("discord.guild_id is required".to_string()))?;

        let channels = self.guild_channels(guild_id).await?;
        let selected = select_channels(&channels, &cfg.allowed_channel_names);
        if selected.is_empty() {
            return Err(BotError::NoChannels);
        }
        tracing::info!("Discovered channels by name: {:?}", selected);
        Ok(selected)
    }
}

/// 从 guild 频道中挑出名称在允许列表内的文本频道（保持 guild 返回的顺序）
pub fn select_channels(channels: &[GuildChannel], allowed_names: &[String]) -> Vec<String> {
    channels
        .iter()
        .filter(|c| c.kind == GUILD_TEXT)
        .filter(|c| {
            c.name
                .as_ref()
                .is_some_and(|n| allowed_names.iter().any(|a| a == n))
        })
        .map(|c| c.id.clone())
        .collect()
}

#[async_trait]
impl ChatTransport for DiscordClient {
    async fn list_messages(
        &self,
        channel_id: &str,
        after: Option<MessageId>,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, BotError> {
        let mut req = self
            .request(Method::GET, &format!("/channels/{}/messages", channel_id))
            .query(&[("limit", limit.to_string())]);
        if let Some(after) = after {
            req = req.query(&[("after", after.to_string())]);
        }

        let messages: Vec<WireMessage> = self.send_json(req).await?;
        Ok(messages.into_iter().map(ChatMessage::from).collect())
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), BotError> {
        let body = json!({ "content": truncate_chars(content, self.max_message_chars) });
        let _: serde_json::Value = self
            .send_json(
                self.request(Method::POST, &format!("/channels/{}/messages", channel_id))
                    .json(&body),
            )
            .await?;
        Ok(())
    }
}
