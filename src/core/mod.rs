//! 核心基础设施：错误类型、优雅关闭

pub mod error;
pub mod shutdown;

pub use error::{truncate_chars, BotError, ERROR_BODY_MAX_CHARS};
pub use shutdown::{ShutdownManager, ShutdownReason};
