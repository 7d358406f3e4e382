//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `BEACON__*` 覆盖（双下划线表示嵌套，如 `BEACON__POLL__INTERVAL_MS=5000`），
//! 最后对仍未设置的键回落到旧版脚本使用的环境变量（`DISCORD_BOT_TOKEN`、`DISCORD_GUILD_ID` 等）。
//!
//! 配置在启动时构造一次，按值/引用传给各组件构造函数，不存在全局单例。

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::BotError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub discord: DiscordSection,
    pub poll: PollSection,
    pub backend: BackendSection,
    pub classifier: ClassifierSection,
    pub conversation: ConversationSection,
}

/// [discord] 段：Bot 凭据、guild、频道、消息长度上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscordSection {
    pub token: Option<String>,
    /// 只处理来自该 guild 的消息
    pub guild_id: Option<String>,
    /// 显式指定的频道；为空时按 allowed_channel_names 在 guild 中查找
    pub channel_ids: Vec<String>,
    pub allowed_channel_names: Vec<String>,
    pub api_base: String,
    /// 运维 Webhook（启动通告、心跳），可选
    pub webhook_url: Option<String>,
    pub max_message_chars: usize,
    pub request_timeout_secs: u64,
}

impl Default for DiscordSection {
    fn default() -> Self {
        Self {
            token: None,
            guild_id: None,
            channel_ids: Vec::new(),
            allowed_channel_names: default_allowed_channel_names(),
            api_base: default_discord_api_base(),
            webhook_url: None,
            max_message_chars: 1900,
            request_timeout_secs: 20,
        }
    }
}

fn default_allowed_channel_names() -> Vec<String> {
    vec!["filings".into(), "filings2".into()]
}

fn default_discord_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

/// 允许的最短轮询间隔（旧版 DISCORD_BOT_POLL_MS 的下限）
pub const MIN_POLL_INTERVAL_MS: u64 = 500;

/// [poll] 段：轮询间隔与每次拉取条数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollSection {
    pub interval_ms: u64,
    /// 频道还没有水位时拉取的条数
    pub initial_limit: u32,
    /// 有水位时（after=<id>）拉取的条数
    pub batch_limit: u32,
    /// 每 N 轮向运维 Webhook 发一次心跳；0 关闭
    pub heartbeat_every: u64,
}

impl Default for PollSection {
    fn default() -> Self {
        Self {
            interval_ms: 4000,
            initial_limit: 25,
            batch_limit: 50,
            heartbeat_every: 100,
        }
    }
}

/// [backend] 段：后端服务地址与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            timeout_secs: 90,
        }
    }
}

/// [classifier] 段：LLM 兜底分类器（API Key 只从 OPENAI_API_KEY 读取）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierSection {
    pub enabled: bool,
    pub model: String,
    /// OpenAI 兼容端点；未设置时用官方地址
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ClassifierSection {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            timeout_secs: 20,
        }
    }
}

/// [conversation] 段
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ConversationSection {
    /// 待确认动作的有效期（秒）；0 表示永不过期（与旧版行为一致）
    pub pending_ttl_secs: u64,
}

impl AppConfig {
    /// 启动前校验：缺少必填项或取值非法时返回 Config 错误，进程应在进入轮询前退出
    pub fn validate(&self) -> Result<(), BotError> {
        if self.discord.token.as_deref().map_or(true, |t| t.trim().is_empty()) {
            return Err(BotError::Config(
                "missing discord.token (or DISCORD_BOT_TOKEN)".to_string(),
            ));
        }
        if self.discord.guild_id.as_deref().map_or(true, |g| g.trim().is_empty()) {
            return Err(BotError::Config(
                "missing discord.guild_id (or DISCORD_GUILD_ID)".to_string(),
            ));
        }
        if self.poll.interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(BotError::Config(format!(
                "poll.interval_ms must be >= {}, got {}",
                MIN_POLL_INTERVAL_MS, self.poll.interval_ms
            )));
        }
        if self.discord.channel_ids.is_empty() && self.discord.allowed_channel_names.is_empty() {
            return Err(BotError::NoChannels);
        }
        Ok(())
    }

    /// 校验通过后使用；未设置时返回空串
    pub fn guild_id(&self) -> &str {
        self.discord.guild_id.as_deref().unwrap_or_default()
    }

    /// 对仍未设置的键，回落到旧版脚本的环境变量；lookup 便于测试注入
    pub fn apply_legacy_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.discord.token.is_none() {
            self.discord.token = get("DISCORD_BOT_TOKEN");
        }
        if self.discord.guild_id.is_none() {
            self.discord.guild_id = get("DISCORD_GUILD_ID");
        }
        if self.discord.channel_ids.is_empty() {
            self.discord.channel_ids = [
                "DISCORD_FILINGS1_CHANNEL_ID",
                "DISCORD_FILINGS_CHANNEL_ID",
                "DISCORD_FILINGS2_CHANNEL_ID",
            ]
            .into_iter()
            .filter_map(get)
            .fold(Vec::new(), |mut ids, id| {
                if !ids.contains(&id) {
                    ids.push(id);
                }
                ids
            });
        }
        if self.discord.webhook_url.is_none() {
            self.discord.webhook_url = get("DISCORD_WEBHOOK_URL");
        }
        if let Some(ms) = get("DISCORD_BOT_POLL_MS").and_then(|v| v.trim().parse().ok()) {
            if self.poll.interval_ms == PollSection::default().interval_ms {
                self.poll.interval_ms = ms;
            }
        }
        if let Some(url) = get("BEACON_API_BASE_URL") {
            if self.backend.base_url == BackendSection::default().base_url {
                self.backend.base_url = url;
            }
        }
        if let Some(model) = get("OPENAI_MODEL") {
            if self.classifier.model == ClassifierSection::default().model {
                self.classifier.model = model;
            }
        }
    }
}

/// 从 config 目录加载配置，环境变量 BEACON__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 叠加环境变量 BEACON__*（双下划线表示嵌套键，列表用逗号分隔）
/// 4. 旧版环境变量兜底
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut cfg = load_sources(config_path.as_deref(), true)?;
    cfg.apply_legacy_env(|key| std::env::var(key).ok());
    Ok(cfg)
}

fn load_sources(config_path: Option<&Path>, with_env: bool) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.to_path_buf()).required(false));
        } else {
            tracing::warn!("Config file {:?} not found, ignoring", path);
        }
    }

    if with_env {
        builder = builder.add_source(
            config::Environment::with_prefix("BEACON")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("discord.channel_ids")
                .with_list_parse_key("discord.allowed_channel_names"),
        );
    }

    builder.build()?.try_deserialize()
}
