//! 会话状态存储
//!
//! 每个 (channel, author) 至多一个待确认动作；新的提议直接覆盖旧的，不排队。
//! 存储由轮询 worker 独占持有，以 &mut 传入状态机，可替换为持久化实现而不影响解析逻辑。

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use crate::intent::{Cik, Intent, IntentKind};

/// 会话键：同一频道的不同作者、同一作者的不同频道，状态互相独立
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub channel_id: String,
    pub author_id: String,
}

impl ConversationKey {
    pub fn new(channel_id: impl Into<String>, author_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            author_id: author_id.into(),
        }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel_id, self.author_id)
    }
}

/// 已向用户提议、尚未执行的后端动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    Scan,
    Log,
    Cik(Cik),
}

impl PendingAction {
    /// 只有 Scan / Log / Cik 会成为待确认动作
    pub fn from_intent(intent: &Intent) -> Option<Self> {
        match intent {
            Intent::Scan => Some(PendingAction::Scan),
            Intent::Log => Some(PendingAction::Log),
            Intent::Cik(cik) => Some(PendingAction::Cik(cik.clone())),
            _ => None,
        }
    }

    pub fn kind(&self) -> IntentKind {
        match self {
            PendingAction::Scan => IntentKind::Scan,
            PendingAction::Log => IntentKind::Log,
            PendingAction::Cik(_) => IntentKind::Cik,
        }
    }

    pub fn argument(&self) -> Option<&Cik> {
        match self {
            PendingAction::Cik(cik) => Some(cik),
            _ => None,
        }
    }
}

/// 存储槽：动作 + 提议时间（用于可选的过期判断）
#[derive(Debug, Clone)]
pub struct PendingSlot {
    pub action: PendingAction,
    pub proposed_at: Instant,
}

impl PendingSlot {
    pub fn new(action: PendingAction) -> Self {
        Self {
            action,
            proposed_at: Instant::now(),
        }
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.proposed_at.elapsed() > ttl
    }
}

/// 会话状态存储接口（单 worker 独占，故为同步 &mut 接口）
pub trait ConversationStore: Send {
    /// 当前待确认动作；没有记录等价于 Idle
    fn pending(&self, key: &ConversationKey) -> Option<&PendingSlot>;

    /// 记录新的待确认动作，返回被覆盖的旧动作
    fn propose(&mut self, key: &ConversationKey, action: PendingAction) -> Option<PendingAction>;

    /// 取出并清空
    fn take(&mut self, key: &ConversationKey) -> Option<PendingSlot>;

    /// 有待确认动作的会话数
    fn pending_count(&self) -> usize;
}

/// 内存实现（重启即丢失）
#[derive(Debug, Default)]
pub struct MemoryConversationStore {
    slots: HashMap<ConversationKey, PendingSlot>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationStore for MemoryConversationStore {
    fn pending(&self, key: &ConversationKey) -> Option<&PendingSlot> {
        self.slots.get(key)
    }

    fn propose(&mut self, key: &ConversationKey, action: PendingAction) -> Option<PendingAction> {
        self.slots
            .insert(key.clone(), PendingSlot::new(action))
            .map(|old| old.action)
    }

    fn take(&mut self, key: &ConversationKey) -> Option<PendingSlot> {
        self.slots.remove(key)
    }

    fn pending_count(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_propose_overwrites() {
        let mut store = MemoryConversationStore::new();
        let key = ConversationKey::new("c1", "u1");
        assert!(store.propose(&key, PendingAction::Scan).is_none());
        assert_eq!(store.propose(&key, PendingAction::Log), Some(PendingAction::Scan));
        assert_eq!(store.pending(&key).unwrap().action, PendingAction::Log);
        assert_eq!(store.pending_count(), 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let mut store = MemoryConversationStore::new();
        store.propose(&ConversationKey::new("c1", "u1"), PendingAction::Scan);
        assert!(store.pending(&ConversationKey::new("c1", "u2")).is_none());
        assert!(store.pending(&ConversationKey::new("c2", "u1")).is_none());
    }

    #[test]
    fn test_take_clears() {
        let mut store = MemoryConversationStore::new();
        let key = ConversationKey::new("c1", "u1");
        store.propose(&key, PendingAction::Log);
        assert_eq!(store.take(&key).unwrap().action, PendingAction::Log);
        assert!(store.pending(&key).is_none());
        assert!(store.take(&key).is_none());
    }

    #[test]
    fn test_from_intent() {
        let cik = Cik::from_digits("320193").unwrap();
        assert_eq!(
            PendingAction::from_intent(&Intent::Cik(cik.clone())),
            Some(PendingAction::Cik(cik))
        );
        assert_eq!(PendingAction::from_intent(&Intent::Help), None);
        assert_eq!(PendingAction::from_intent(&Intent::ConfirmYes), None);
    }
}
