//! Beacon Bot 入口
//!
//! 加载并校验配置，构造 Discord / 后端 / 分类器，预热频道水位后进入轮询循环；
//! Ctrl+C 或 SIGTERM 时在当前一轮结束后退出。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use beacon::backend::{CommandDispatcher, HttpBackend};
use beacon::chat::{ChatTransport, DiscordClient, OperatorNotifier, WebhookNotifier};
use beacon::config::{load_config, AppConfig};
use beacon::conversation::{ConversationMachine, MemoryConversationStore};
use beacon::core::ShutdownManager;
use beacon::intent::{IntentResolver, LlmClassifier};
use beacon::llm::OpenAiClient;
use beacon::observability;
use beacon::poll::{PollLoop, PollSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    // 第一个命令行参数可指定额外的配置文件
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;
    cfg.validate().context("Invalid config")?;

    let discord = Arc::new(DiscordClient::new(&cfg.discord).context("Failed to create Discord client")?);
    let channels = discord
        .resolve_channels(&cfg.discord)
        .await
        .context("Failed to resolve channels")?;

    let backend = Arc::new(HttpBackend::new(&cfg.backend).context("Failed to create backend client")?);
    let ttl = Duration::from_secs(cfg.conversation.pending_ttl_secs);
    let machine = ConversationMachine::new(MemoryConversationStore::new(), CommandDispatcher::new(backend))
        .with_pending_ttl(Some(ttl));

    let resolver = build_resolver(&cfg);
    let notifier: Option<Arc<dyn OperatorNotifier>> =
        WebhookNotifier::from_url(cfg.discord.webhook_url.as_deref(), cfg.discord.max_message_chars)
            .map(|n| Arc::new(n) as Arc<dyn OperatorNotifier>);

    let bot_id = match discord.current_user_id().await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Failed to fetch bot identity: {}", e);
            "<unknown>".to_string()
        }
    };

    if let Some(notifier) = &notifier {
        notifier
            .notify(&format!(
                "Start polling... botId={} freq={}ms",
                bot_id, cfg.poll.interval_ms
            ))
            .await;
    }
    tracing::info!(
        bot_id = %bot_id,
        guild = cfg.guild_id(),
        channels = ?channels,
        interval_ms = cfg.poll.interval_ms,
        classifier = resolver.has_classifier(),
        backend = %cfg.backend.base_url,
        "Beacon bot starting"
    );

    let chat: Arc<dyn ChatTransport> = discord;
    let mut poll_loop = PollLoop::new(
        chat,
        resolver,
        machine,
        channels,
        cfg.guild_id(),
        PollSettings::from(&cfg.poll),
    )
    .with_notifier(notifier);

    let primed = poll_loop.prime().await;
    tracing::info!("Primed {}/{} channels", primed, poll_loop.channels().len());

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();
    poll_loop.run(shutdown.token()).await;

    Ok(())
}

/// 分类器需同时满足：配置启用且设置了 OPENAI_API_KEY；否则只用规则
fn build_resolver(cfg: &AppConfig) -> IntentResolver {
    if !cfg.classifier.enabled {
        tracing::info!("Classifier disabled by config, using rules only");
        return IntentResolver::rules_only();
    }
    let Some(api_key) = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()) else {
        tracing::warn!("OPENAI_API_KEY not set, using rules only");
        return IntentResolver::rules_only();
    };

    let llm = OpenAiClient::new(
        cfg.classifier.base_url.as_deref(),
        &cfg.classifier.model,
        &api_key,
        cfg.classifier.timeout_secs,
    );
    tracing::info!("Classifier enabled with model {}", llm.model());
    IntentResolver::with_classifier(Arc::new(LlmClassifier::new(Arc::new(llm))))
}
