//! 后端命令层
//!
//! BackendTransport 只负责「发请求、拿回 JSON 或文本」；CommandDispatcher 把已确认的动作映射到具体端点，
//! 并把任何失败转换为给用户看的简短结果，不向状态机抛错。

mod dispatcher;
mod http;
pub mod mock;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::BotError;

pub use dispatcher::{CommandDispatcher, ExecutionOutcome, FAILURE_MAX_CHARS};
pub use http::HttpBackend;
pub use mock::ScriptedBackend;

pub const SCAN_PATH: &str = "/api/scan-rss-feed";
pub const LOG_PATH: &str = "/api/log";
pub const CIK_PATH: &str = "/api/cik-json";

/// 一次后端调用：路径 + 查询参数（由传输层负责 URL 编码）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRequest {
    pub path: &'static str,
    pub query: Vec<(&'static str, String)>,
}

impl BackendRequest {
    pub fn get(path: &'static str) -> Self {
        Self {
            path,
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }
}

impl fmt::Display for BackendRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path)?;
        for (i, (k, v)) in self.query.iter().enumerate() {
            write!(f, "{}{}={}", if i == 0 { '?' } else { '&' }, k, v)?;
        }
        Ok(())
    }
}

/// 后端响应：能解析为 JSON 则为 Json，否则保留原文
#[derive(Debug, Clone, PartialEq)]
pub enum BackendResponse {
    Json(Value),
    Text(String),
}

impl BackendResponse {
    pub fn from_body(body: String) -> Self {
        match serde_json::from_str(&body) {
            Ok(value) => BackendResponse::Json(value),
            Err(_) => BackendResponse::Text(body),
        }
    }
}

/// 后端传输接口
#[async_trait]
pub trait BackendTransport: Send + Sync {
    async fn invoke(&self, request: &BackendRequest) -> Result<BackendResponse, BotError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_display() {
        assert_eq!(BackendRequest::get(LOG_PATH).to_string(), "/api/log");
        assert_eq!(
            BackendRequest::get(CIK_PATH).with_query("cik", "0000320193").to_string(),
            "/api/cik-json?cik=0000320193"
        );
    }

    #[test]
    fn test_response_from_body() {
        assert_eq!(
            BackendResponse::from_body(r#"{"results":[]}"#.into()),
            BackendResponse::Json(serde_json::json!({"results": []}))
        );
        assert_eq!(
            BackendResponse::from_body("ok".into()),
            BackendResponse::Text("ok".into())
        );
    }
}
