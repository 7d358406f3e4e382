//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 按脚本依次返回预设结果；脚本耗尽后重复最后一条。记录调用次数，便于断言「是否调用了 LLM」。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{JsonFormat, LlmClient, LlmError, Message};

/// Mock 客户端：按顺序回放预设回复
#[derive(Debug)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    last: Mutex<Result<String, LlmError>>,
    calls: AtomicUsize,
}

impl MockLlmClient {
    pub fn scripted(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(replies.into()),
            last: Mutex::new(Err(LlmError::EmptyResponse)),
            calls: AtomicUsize::new(0),
        }
    }

    /// 总是返回同一段文本
    pub fn replying(text: impl Into<String>) -> Self {
        Self::scripted(vec![Ok(text.into())])
    }

    /// 总是返回同一个错误
    pub fn failing(err: LlmError) -> Self {
        Self::scripted(vec![Err(err)])
    }

    /// 已被调用的次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(reply) = self
            .script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front()
        {
            *last = reply;
        }
        last.clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete_structured(
        &self,
        _messages: &[Message],
        _format: &JsonFormat,
    ) -> Result<String, LlmError> {
        self.next()
    }
}
