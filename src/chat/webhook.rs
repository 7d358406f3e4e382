//! 运维 Webhook 通知：启动通告、心跳。尽力而为，失败只记日志

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::OperatorNotifier;
use crate::core::truncate_chars;

pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
    max_chars: usize,
}

impl WebhookNotifier {
    /// 未配置 URL 时返回 None
    pub fn from_url(url: Option<&str>, max_chars: usize) -> Option<Self> {
        let url = url.map(str::trim).filter(|u| !u.is_empty())?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .ok()?;
        Some(Self {
            http,
            url: url.to_string(),
            max_chars,
        })
    }
}

#[async_trait]
impl OperatorNotifier for WebhookNotifier {
    async fn notify(&self, content: &str) {
        let body = json!({ "content": truncate_chars(content, self.max_chars) });
        match self.http.post(&self.url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                tracing::warn!("Webhook failed: {} {}", status, truncate_chars(&text, 200));
            }
            Err(e) => tracing::warn!("Webhook failed: {}", e),
        }
    }
}
