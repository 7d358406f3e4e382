//! Beacon - Discord 聊天控制面
//!
//! 模块划分：
//! - **backend**: 后端传输（HTTP）与命令分发（动作 -> 端点 -> 结果摘要）
//! - **chat**: 聊天传输（Discord REST）、运维 Webhook、内存实现
//! - **config**: 应用配置加载（TOML + 环境变量 + 旧版变量兜底）
//! - **conversation**: (channel, author) 待确认动作存储与确认状态机
//! - **core**: 错误类型、优雅关闭
//! - **intent**: 意图模型、规则匹配、LLM 分类器兜底
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **observability**: tracing 日志初始化
//! - **poll**: 频道水位与轮询循环

pub mod backend;
pub mod chat;
pub mod config;
pub mod conversation;
pub mod core;
pub mod intent;
pub mod llm;
pub mod observability;
pub mod poll;
