//! 命令分发：已确认的动作 -> 唯一的后端操作 -> 执行结果

use std::sync::Arc;

use super::{BackendRequest, BackendResponse, BackendTransport, CIK_PATH, LOG_PATH, SCAN_PATH};
use crate::conversation::PendingAction;
use crate::core::truncate_chars;

/// 失败信息回显给用户时的最大字符数
pub const FAILURE_MAX_CHARS: usize = 1400;

/// 执行结果（成功摘要 / 截断后的失败信息）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Succeeded(String),
    Failed(String),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Succeeded(_))
    }
}

/// 命令分发器
#[derive(Clone)]
pub struct CommandDispatcher {
    backend: Arc<dyn BackendTransport>,
}

impl CommandDispatcher {
    pub fn new(backend: Arc<dyn BackendTransport>) -> Self {
        Self { backend }
    }

    /// 动作对应的后端请求
    pub fn request_for(action: &PendingAction) -> BackendRequest {
        match action {
            PendingAction::Scan => BackendRequest::get(SCAN_PATH),
            PendingAction::Log => BackendRequest::get(LOG_PATH),
            PendingAction::Cik(cik) => BackendRequest::get(CIK_PATH).with_query("cik", cik.as_str()),
        }
    }

    /// 执行动作；任何后端失败都转换为 Failed，不向上传播
    pub async fn execute(&self, action: &PendingAction) -> ExecutionOutcome {
        let request = Self::request_for(action);
        match self.backend.invoke(&request).await {
            Ok(response) => {
                let summary = summarize(action, &response);
                tracing::info!(kind = %action.kind(), "Command {} succeeded: {}", request, summary);
                ExecutionOutcome::Succeeded(summary)
            }
            Err(e) => {
                tracing::error!(kind = %action.kind(), "Command {} failed: {}", request, e);
                ExecutionOutcome::Failed(truncate_chars(&e.to_string(), FAILURE_MAX_CHARS))
            }
        }
    }
}

fn summarize(action: &PendingAction, response: &BackendResponse) -> String {
    match action {
        PendingAction::Scan => {
            let count = match response {
                BackendResponse::Json(value) => value
                    .get("results")
                    .and_then(|r| r.as_array())
                    .map(|r| r.len().to_string()),
                BackendResponse::Text(_) => None,
            };
            format!(
                "scan completed with {} result(s).",
                count.as_deref().unwrap_or("?")
            )
        }
        PendingAction::Log => "log export completed.".to_string(),
        PendingAction::Cik(cik) => format!("cik-json completed for {}.", cik),
    }
}
