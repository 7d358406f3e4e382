//! reqwest 实现的后端传输（GET base_url + path，查询参数由 reqwest 编码）

use std::time::Duration;

use async_trait::async_trait;

use super::{BackendRequest, BackendResponse, BackendTransport};
use crate::config::BackendSection;
use crate::core::BotError;

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(cfg: &BackendSection) -> Result<Self, BotError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BackendTransport for HttpBackend {
    async fn invoke(&self, request: &BackendRequest) -> Result<BackendResponse, BotError> {
        let url = format!("{}{}", self.base_url, request.path);
        tracing::debug!("Backend GET {}{}", self.base_url, request);

        let resp = self.client.get(&url).query(&request.query).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(BotError::backend(status.as_u16(), &body));
        }
        Ok(BackendResponse::from_body(body))
    }
}
