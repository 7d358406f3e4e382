//! 轮询循环
//!
//! 单 worker、固定顺序轮询各频道：一个频道的新消息按 ID 升序全部处理完，再处理下一个；一轮结束后休眠固定间隔。
//! 解析（可能调用分类器）与执行（调用后端）都在 worker 内顺序 await，因此同一时刻只处理一条消息，
//! 会话存储与水位无需加锁。某个频道出错只记日志，不影响本轮其它频道，下一轮原样重试。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::WatermarkTracker;
use crate::chat::{ChatTransport, OperatorNotifier};
use crate::config::PollSection;
use crate::conversation::{ConversationKey, ConversationMachine, ConversationStore, MemoryConversationStore};
use crate::core::BotError;
use crate::intent::IntentResolver;

/// 轮询参数
#[derive(Debug, Clone)]
pub struct PollSettings {
    pub interval: Duration,
    pub initial_limit: u32,
    pub batch_limit: u32,
    pub heartbeat_every: u64,
}

impl From<&PollSection> for PollSettings {
    fn from(cfg: &PollSection) -> Self {
        Self {
            interval: Duration::from_millis(cfg.interval_ms),
            initial_limit: cfg.initial_limit,
            batch_limit: cfg.batch_limit,
            heartbeat_every: cfg.heartbeat_every,
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from(&PollSection::default())
    }
}

/// 一轮的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundReport {
    pub channels_ok: usize,
    pub channels_failed: usize,
    /// 拉取到且高于水位的消息数
    pub messages_seen: usize,
    /// 通过过滤、交给状态机的消息数
    pub messages_handled: usize,
}

pub struct PollLoop<S: ConversationStore = MemoryConversationStore> {
    chat: Arc<dyn ChatTransport>,
    resolver: IntentResolver,
    machine: ConversationMachine<S>,
    watermarks: WatermarkTracker,
    primed: HashSet<String>,
    channels: Vec<String>,
    guild_id: String,
    settings: PollSettings,
    notifier: Option<Arc<dyn OperatorNotifier>>,
    rounds: u64,
}

impl<S: ConversationStore> PollLoop<S> {
    pub fn new(
        chat: Arc<dyn ChatTransport>,
        resolver: IntentResolver,
        machine: ConversationMachine<S>,
        channels: Vec<String>,
        guild_id: impl Into<String>,
        settings: PollSettings,
    ) -> Self {
        Self {
            chat,
            resolver,
            machine,
            watermarks: WatermarkTracker::new(),
            primed: HashSet::new(),
            channels,
            guild_id: guild_id.into(),
            settings,
            notifier: None,
            rounds: 0,
        }
    }

    pub fn with_notifier(mut self, notifier: Option<Arc<dyn OperatorNotifier>>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn watermarks(&self) -> &WatermarkTracker {
        &self.watermarks
    }

    pub fn machine_mut(&mut self) -> &mut ConversationMachine<S> {
        &mut self.machine
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// 启动时预热：记录每个频道最新一条消息的 ID，避免处理历史消息。返回成功预热的频道数
    pub async fn prime(&mut self) -> usize {
        let channels = self.channels.clone();
        let mut ok = 0;
        for channel in &channels {
            match self.prime_channel(channel).await {
                Ok(()) => ok += 1,
                Err(e) => tracing::error!("Priming failed for {}: {}", channel, e),
            }
        }
        ok
    }

    async fn prime_channel(&mut self, channel: &str) -> Result<(), BotError> {
        let latest = self.chat.list_messages(channel, None, 1).await?;
        if let Some(id) = latest.iter().map(|m| m.id).max() {
            self.watermarks.observe(channel, id);
        }
        tracing::debug!(
            "Primed {} at {:?}",
            channel,
            self.watermarks.cursor_for(channel)
        );
        self.primed.insert(channel.to_string());
        Ok(())
    }

    /// 执行一轮：按固定顺序处理所有频道，单个频道失败不影响其它频道
    pub async fn run_round(&mut self) -> RoundReport {
        let mut report = RoundReport::default();
        let channels = self.channels.clone();

        for channel in &channels {
            // 预热失败的频道先补预热，本轮不处理其消息
            let result = if self.primed.contains(channel) {
                self.poll_channel(channel, &mut report).await
            } else {
                self.prime_channel(channel).await
            };
            match result {
                Ok(()) => report.channels_ok += 1,
                Err(e) => {
                    report.channels_failed += 1;
                    tracing::error!("Poll failed for {}: {}", channel, e);
                }
            }
        }

        self.rounds += 1;
        if self.settings.heartbeat_every > 0 && self.rounds % self.settings.heartbeat_every == 0 {
            if let Some(notifier) = &self.notifier {
                notifier.notify(&format!("{} poll counts", self.rounds)).await;
            }
        }

        report
    }

    async fn poll_channel(&mut self, channel: &str, report: &mut RoundReport) -> Result<(), BotError> {
        let after = self.watermarks.cursor_for(channel);
        let limit = if after.is_some() {
            self.settings.batch_limit
        } else {
            self.settings.initial_limit
        };

        let mut messages = self.chat.list_messages(channel, after, limit).await?;
        messages.sort_by_key(|m| m.id);

        for message in messages {
            if self
                .watermarks
                .cursor_for(channel)
                .is_some_and(|mark| message.id <= mark)
            {
                continue;
            }
            self.watermarks.observe(channel, message.id);
            report.messages_seen += 1;

            if !message.is_actionable(&self.guild_id) {
                continue;
            }

            let key = ConversationKey::new(channel, message.author_id.as_str());
            let intent = self.resolver.resolve(&message.content).await;
            let transition = self.machine.handle(self.chat.as_ref(), &key, intent).await?;
            tracing::debug!(%key, message_id = %message.id, "{:?}", transition);
            report.messages_handled += 1;
        }

        Ok(())
    }

    /// 持续轮询，直到 shutdown 被取消（只在两轮之间退出）
    pub async fn run(&mut self, shutdown: CancellationToken) {
        while !shutdown.is_cancelled() {
            let report = self.run_round().await;
            if report.messages_seen > 0 || report.channels_failed > 0 {
                tracing::info!(round = self.rounds, ?report, "Poll round finished");
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.settings.interval) => {}
            }
        }
        tracing::info!("Poll loop stopped after {} rounds", self.rounds);
    }
}
