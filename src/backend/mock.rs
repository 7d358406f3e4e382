//! 脚本化后端（用于测试，无需启动服务）：固定回复，记录收到的请求

use std::sync::Mutex;

use async_trait::async_trait;

use super::{BackendRequest, BackendResponse, BackendTransport};
use crate::core::BotError;

type ErrorFactory = Box<dyn Fn() -> BotError + Send + Sync>;

enum Reply {
    Ok(BackendResponse),
    Err(ErrorFactory),
}

pub struct ScriptedBackend {
    reply: Reply,
    requests: Mutex<Vec<BackendRequest>>,
}

impl ScriptedBackend {
    pub fn replying(response: BackendResponse) -> Self {
        Self {
            reply: Reply::Ok(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// BotError 不可 Clone，故传入工厂函数，每次调用生成一个新错误
    pub fn failing<F>(make_error: F) -> Self
    where
        F: Fn() -> BotError + Send + Sync + 'static,
    {
        Self {
            reply: Reply::Err(Box::new(make_error)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 按顺序返回收到的请求
    pub fn requests(&self) -> Vec<BackendRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

#[async_trait]
impl BackendTransport for ScriptedBackend {
    async fn invoke(&self, request: &BackendRequest) -> Result<BackendResponse, BotError> {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(request.clone());
        match &self.reply {
            Reply::Ok(response) => Ok(response.clone()),
            Reply::Err(make_error) => Err(make_error()),
        }
    }
}
