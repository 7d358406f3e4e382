//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 LlmClient::complete_structured（受 JSON Schema 约束的输出）。
//! 失败以 LlmError 返回，由调用方决定降级方式，而不是抛到上层。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    System,
}

/// 单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 结构化输出格式：名称 + JSON Schema（strict 模式）
#[derive(Clone, Debug)]
pub struct JsonFormat {
    pub name: String,
    pub description: Option<String>,
    pub schema: Value,
}

/// LLM 调用错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("LLM request timed out after {0}s")]
    Timeout(u64),

    #[error("LLM transport error: {0}")]
    Transport(String),

    #[error("LLM request could not be built: {0}")]
    InvalidRequest(String),

    #[error("LLM returned no content")]
    EmptyResponse,
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 要求输出严格符合 format.schema 的 JSON 文本；返回原始文本，由调用方解析校验
    async fn complete_structured(
        &self,
        messages: &[Message],
        format: &JsonFormat,
    ) -> Result<String, LlmError>;
}
