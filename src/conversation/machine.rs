//! 会话状态机
//!
//! 两个概念状态：Idle（无待确认动作）与 AwaitingConfirmation（有一个待确认动作）。
//! 执行永远需要同一会话键发出的显式 ConfirmYes；执行后无论成败都回到 Idle 并提示下一步。

use std::time::Duration;

use super::{ConversationKey, ConversationStore, MemoryConversationStore, PendingAction};
use crate::backend::{CommandDispatcher, ExecutionOutcome};
use crate::chat::ChatTransport;
use crate::core::BotError;
use crate::intent::Intent;

pub const HELP_TEXT: &str =
    "I can help with: `scan rss`, `cik <CIK>`, `log`. I will confirm before running.";
pub const HINT_TEXT: &str = "I can help. Say `scan rss`, `cik <CIK>`, `log`, or `help`.";
pub const WAITING_TEXT: &str = "I am waiting for confirmation. Reply `yes` or `no`.";
pub const CANCELLED_TEXT: &str = "Cancelled. Tell me your next command.";
pub const NOTHING_PENDING_TEXT: &str = "I don't have a valid pending action.";
pub const HERE_WE_GO_TEXT: &str = "Here we go.";
pub const NEXT_STEP_TEXT: &str =
    "What do you want to do next? You can say: scan rss, cik <CIK>, log, help.";

/// 一次处理的结果（供日志与测试断言；回复已经发出）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Helped,
    Proposed {
        action: PendingAction,
        replaced: Option<PendingAction>,
    },
    Cancelled,
    Executed {
        action: PendingAction,
        outcome: ExecutionOutcome,
    },
    NothingPending,
    Hinted,
    Reminded,
}

/// 状态机：独占持有会话存储，按会话键串行处理
pub struct ConversationMachine<S: ConversationStore = MemoryConversationStore> {
    store: S,
    dispatcher: CommandDispatcher,
    /// 待确认动作有效期；None 表示永不过期
    pending_ttl: Option<Duration>,
}

impl<S: ConversationStore> ConversationMachine<S> {
    pub fn new(store: S, dispatcher: CommandDispatcher) -> Self {
        Self {
            store,
            dispatcher,
            pending_ttl: None,
        }
    }

    pub fn with_pending_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.pending_ttl = ttl.filter(|t| !t.is_zero());
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 当前待确认动作（已过期的会被清除）
    pub fn pending(&mut self, key: &ConversationKey) -> Option<PendingAction> {
        let slot = self.store.pending(key)?;
        if let Some(ttl) = self.pending_ttl {
            if slot.is_expired(ttl) {
                tracing::info!(%key, "Pending {} expired", slot.action.kind());
                self.store.take(key);
                return None;
            }
        }
        Some(slot.action.clone())
    }

    /// 处理一条已解析的意图，向 key.channel_id 发送回复
    pub async fn handle(
        &mut self,
        chat: &dyn ChatTransport,
        key: &ConversationKey,
        intent: Intent,
    ) -> Result<Transition, BotError> {
        let reply = Reply { chat, key };

        if intent == Intent::Help {
            reply.send(HELP_TEXT).await?;
            return Ok(Transition::Helped);
        }

        if let Some(action) = PendingAction::from_intent(&intent) {
            let replaced = self.store.propose(key, action.clone());
            tracing::info!(%key, "Proposed {} (replaced: {:?})", action.kind(), replaced);
            reply.send(&proposal_text(&action)).await?;
            return Ok(Transition::Proposed { action, replaced });
        }

        match intent {
            Intent::ConfirmNo => {
                self.store.take(key);
                reply.send(CANCELLED_TEXT).await?;
                Ok(Transition::Cancelled)
            }
            Intent::ConfirmYes => {
                let Some(action) = self.pending(key) else {
                    reply.send(NOTHING_PENDING_TEXT).await?;
                    return Ok(Transition::NothingPending);
                };
                // "Here we go." 发送失败时保留待确认动作，用户可以再次确认
                reply.send(HERE_WE_GO_TEXT).await?;
                self.store.take(key);

                let outcome = self.dispatcher.execute(&action).await;
                let result_text = match &outcome {
                    ExecutionOutcome::Succeeded(summary) => format!("Here is the result: {}", summary),
                    ExecutionOutcome::Failed(error) => format!("Sorry, command failed: {}", error),
                };
                // 结果发送失败也要尝试下一步提示，返回第一个错误
                let sent_result = reply.send(&result_text).await;
                let sent_next = reply.send(NEXT_STEP_TEXT).await;
                sent_result.and(sent_next)?;
                Ok(Transition::Executed { action, outcome })
            }
            _ => {
                if self.pending(key).is_some() {
                    reply.send(WAITING_TEXT).await?;
                    Ok(Transition::Reminded)
                } else {
                    reply.send(HINT_TEXT).await?;
                    Ok(Transition::Hinted)
                }
            }
        }
    }
}

/// 发往某个会话的回复，统一加上 <@author> 前缀
struct Reply<'a> {
    chat: &'a dyn ChatTransport,
    key: &'a ConversationKey,
}

impl Reply<'_> {
    async fn send(&self, text: &str) -> Result<(), BotError> {
        let content = format!("<@{}> {}", self.key.author_id, text);
        self.chat.send_message(&self.key.channel_id, &content).await
    }
}

fn proposal_text(action: &PendingAction) -> String {
    match action {
        PendingAction::Scan => {
            "Next I will scan RSS feed. Please confirm by replying `yes`.".to_string()
        }
        PendingAction::Log => {
            "Next I will export log/state. Please confirm by replying `yes`.".to_string()
        }
        PendingAction::Cik(cik) => format!(
            "Next I will fetch cik-json for `{}`. Please confirm by replying `yes`.",
            cik
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::backend::{BackendResponse, ScriptedBackend};
    use crate::chat::{ChatMessage, MessageId, RecordingChat};
    use crate::intent::Cik;

    fn machine(backend: Arc<ScriptedBackend>) -> ConversationMachine {
        ConversationMachine::new(MemoryConversationStore::new(), CommandDispatcher::new(backend))
    }

    fn ok_backend() -> Arc<ScriptedBackend> {
        Arc::new(ScriptedBackend::replying(BackendResponse::Json(
            json!({"results": [{"id": 1}, {"id": 2}]}),
        )))
    }

    fn key() -> ConversationKey {
        ConversationKey::new("chan", "alice")
    }

    #[tokio::test]
    async fn test_propose_scan_from_idle() {
        let chat = RecordingChat::new();
        let mut m = machine(ok_backend());

        let t = m.handle(&chat, &key(), Intent::Scan).await.unwrap();
        assert_eq!(
            t,
            Transition::Proposed {
                action: PendingAction::Scan,
                replaced: None
            }
        );
        assert_eq!(m.pending(&key()), Some(PendingAction::Scan));
        assert_eq!(
            chat.sent_to("chan"),
            vec!["<@alice> Next I will scan RSS feed. Please confirm by replying `yes`."]
        );
    }

    #[tokio::test]
    async fn test_confirm_executes_and_resets() {
        let chat = RecordingChat::new();
        let backend = ok_backend();
        let mut m = machine(backend.clone());

        m.handle(&chat, &key(), Intent::Scan).await.unwrap();
        chat.clear_sent();
        let t = m.handle(&chat, &key(), Intent::ConfirmYes).await.unwrap();

        assert!(matches!(t, Transition::Executed { action: PendingAction::Scan, ref outcome } if outcome.is_success()));
        assert_eq!(backend.calls(), 1);
        assert_eq!(m.pending(&key()), None);
        assert_eq!(
            chat.sent_to("chan"),
            vec![
                format!("<@alice> {}", HERE_WE_GO_TEXT),
                "<@alice> Here is the result: scan completed with 2 result(s).".to_string(),
                format!("<@alice> {}", NEXT_STEP_TEXT),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_execution_still_resets_and_prompts() {
        let chat = RecordingChat::new();
        let backend = Arc::new(ScriptedBackend::failing(|| BotError::backend(500, "boom")));
        let mut m = machine(backend.clone());

        m.handle(&chat, &key(), Intent::Log).await.unwrap();
        chat.clear_sent();
        let t = m.handle(&chat, &key(), Intent::ConfirmYes).await.unwrap();

        assert!(matches!(t, Transition::Executed { outcome: ExecutionOutcome::Failed(_), .. }));
        assert_eq!(m.pending(&key()), None);
        let sent = chat.sent_to("chan");
        assert_eq!(sent[1], "<@alice> Sorry, command failed: API 500: boom");
        assert_eq!(sent.last().unwrap(), &format!("<@alice> {}", NEXT_STEP_TEXT));
    }

    #[tokio::test]
    async fn test_cancel_never_dispatches() {
        let chat = RecordingChat::new();
        let backend = ok_backend();
        let mut m = machine(backend.clone());

        m.handle(&chat, &key(), Intent::Log).await.unwrap();
        let t = m.handle(&chat, &key(), Intent::ConfirmNo).await.unwrap();

        assert_eq!(t, Transition::Cancelled);
        assert_eq!(m.pending(&key()), None);
        assert_eq!(backend.calls(), 0);
        assert_eq!(chat.sent_to("chan").last().unwrap(), "<@alice> Cancelled. Tell me your next command.");
    }

    #[tokio::test]
    async fn test_yes_without_pending_never_dispatches() {
        let chat = RecordingChat::new();
        let backend = ok_backend();
        let mut m = machine(backend.clone());

        let t = m.handle(&chat, &key(), Intent::ConfirmYes).await.unwrap();
        assert_eq!(t, Transition::NothingPending);
        assert_eq!(backend.calls(), 0);
        assert_eq!(chat.sent_to("chan"), vec![format!("<@alice> {}", NOTHING_PENDING_TEXT)]);
    }

    #[tokio::test]
    async fn test_new_proposal_overwrites_pending() {
        let chat = RecordingChat::new();
        let backend = ok_backend();
        let mut m = machine(backend.clone());
        let cik = Cik::from_digits("320193").unwrap();

        m.handle(&chat, &key(), Intent::Scan).await.unwrap();
        let t = m.handle(&chat, &key(), Intent::Cik(cik.clone())).await.unwrap();
        assert_eq!(
            t,
            Transition::Proposed {
                action: PendingAction::Cik(cik.clone()),
                replaced: Some(PendingAction::Scan)
            }
        );
        assert!(chat.sent_to("chan").last().unwrap().contains("`0000320193`"));

        m.handle(&chat, &key(), Intent::ConfirmYes).await.unwrap();
        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].to_string(), "/api/cik-json?cik=0000320193");
    }

    #[tokio::test]
    async fn test_none_hint_vs_reminder() {
        let chat = RecordingChat::new();
        let mut m = machine(ok_backend());

        assert_eq!(m.handle(&chat, &key(), Intent::None).await.unwrap(), Transition::Hinted);
        m.handle(&chat, &key(), Intent::Scan).await.unwrap();
        assert_eq!(m.handle(&chat, &key(), Intent::None).await.unwrap(), Transition::Reminded);
        // 提醒不改变状态
        assert_eq!(m.pending(&key()), Some(PendingAction::Scan));

        let sent = chat.sent_to("chan");
        assert_eq!(sent[0], format!("<@alice> {}", HINT_TEXT));
        assert_eq!(sent[2], format!("<@alice> {}", WAITING_TEXT));
    }

    #[tokio::test]
    async fn test_help_keeps_pending() {
        let chat = RecordingChat::new();
        let mut m = machine(ok_backend());

        m.handle(&chat, &key(), Intent::Log).await.unwrap();
        assert_eq!(m.handle(&chat, &key(), Intent::Help).await.unwrap(), Transition::Helped);
        assert_eq!(m.pending(&key()), Some(PendingAction::Log));
    }

    #[tokio::test]
    async fn test_confirmation_is_per_author_and_channel() {
        let chat = RecordingChat::new();
        let backend = ok_backend();
        let mut m = machine(backend.clone());

        m.handle(&chat, &key(), Intent::Scan).await.unwrap();
        let bob = ConversationKey::new("chan", "bob");
        let elsewhere = ConversationKey::new("other", "alice");

        assert_eq!(m.handle(&chat, &bob, Intent::ConfirmYes).await.unwrap(), Transition::NothingPending);
        assert_eq!(m.handle(&chat, &elsewhere, Intent::ConfirmYes).await.unwrap(), Transition::NothingPending);
        assert_eq!(backend.calls(), 0);
        assert_eq!(m.pending(&key()), Some(PendingAction::Scan));
    }

    /// 对包含指定文本的发送失败若干次，其余转发给 RecordingChat
    struct FlakyChat {
        inner: RecordingChat,
        fail_on: &'static str,
        failures_left: AtomicUsize,
    }

    impl FlakyChat {
        fn new(fail_on: &'static str, failures: usize) -> Self {
            Self {
                inner: RecordingChat::new(),
                fail_on,
                failures_left: AtomicUsize::new(failures),
            }
        }
    }

    #[async_trait]
    impl ChatTransport for FlakyChat {
        async fn list_messages(
            &self,
            channel_id: &str,
            after: Option<MessageId>,
            limit: u32,
        ) -> Result<Vec<ChatMessage>, BotError> {
            self.inner.list_messages(channel_id, after, limit).await
        }

        async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), BotError> {
            if content.contains(self.fail_on)
                && self
                    .failures_left
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
            {
                return Err(BotError::chat(429, "rate limited"));
            }
            self.inner.send_message(channel_id, content).await
        }
    }

    #[tokio::test]
    async fn test_failed_start_reply_keeps_action_for_retry() {
        let chat = FlakyChat::new(HERE_WE_GO_TEXT, 1);
        let backend = ok_backend();
        let mut m = machine(backend.clone());

        m.handle(&chat, &key(), Intent::Scan).await.unwrap();
        assert!(matches!(
            m.handle(&chat, &key(), Intent::ConfirmYes).await,
            Err(BotError::Chat { status: 429, .. })
        ));
        assert_eq!(backend.calls(), 0);
        assert_eq!(m.pending(&key()), Some(PendingAction::Scan));

        let t = m.handle(&chat, &key(), Intent::ConfirmYes).await.unwrap();
        assert!(matches!(t, Transition::Executed { action: PendingAction::Scan, .. }));
        assert_eq!(backend.calls(), 1);
        assert_eq!(m.pending(&key()), None);
    }

    #[tokio::test]
    async fn test_failed_result_reply_still_prompts_next_step() {
        let chat = FlakyChat::new("Here is the result", 1);
        let backend = ok_backend();
        let mut m = machine(backend.clone());

        m.handle(&chat, &key(), Intent::Log).await.unwrap();
        chat.inner.clear_sent();
        assert!(m.handle(&chat, &key(), Intent::ConfirmYes).await.is_err());

        assert_eq!(backend.calls(), 1);
        assert_eq!(m.pending(&key()), None);
        assert_eq!(
            chat.inner.sent_to("chan"),
            vec![
                format!("<@alice> {}", HERE_WE_GO_TEXT),
                format!("<@alice> {}", NEXT_STEP_TEXT),
            ]
        );
    }

    #[tokio::test]
    async fn test_pending_ttl_expires_action() {
        let chat = RecordingChat::new();
        let backend = ok_backend();
        let mut m = machine(backend.clone()).with_pending_ttl(Some(Duration::from_millis(1)));

        m.handle(&chat, &key(), Intent::Scan).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(m.handle(&chat, &key(), Intent::ConfirmYes).await.unwrap(), Transition::NothingPending);
        assert_eq!(backend.calls(), 0);
        assert_eq!(m.store().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_ttl_means_no_expiry() {
        let chat = RecordingChat::new();
        let mut m = machine(ok_backend()).with_pending_ttl(Some(Duration::ZERO));

        m.handle(&chat, &key(), Intent::Scan).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(m.pending(&key()), Some(PendingAction::Scan));
    }
}
