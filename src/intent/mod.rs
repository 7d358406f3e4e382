//! 意图识别模块
//!
//! 把任意消息文本解析为封闭集合中的一个意图：先走确定性规则（rules），
//! 规则未命中时才调用可选的 LLM 兜底分类器（classifier）。分类器的任何失败都降级为 Intent::None。

mod classifier;
mod resolver;
mod rules;

use std::fmt;
use std::str::FromStr;

pub use classifier::{Classifier, ClassifierOutcome, LlmClassifier};
pub use resolver::IntentResolver;
pub use rules::match_rules;

/// CIK 位数（左侧补零到该长度）
pub const CIK_WIDTH: usize = 10;

/// 意图标签（封闭枚举，与分类器 Schema 的 enum 一一对应）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentKind {
    Scan,
    Cik,
    Log,
    Help,
    ConfirmYes,
    ConfirmNo,
    None,
}

impl IntentKind {
    pub const ALL: [IntentKind; 7] = [
        IntentKind::Scan,
        IntentKind::Cik,
        IntentKind::Log,
        IntentKind::Help,
        IntentKind::ConfirmYes,
        IntentKind::ConfirmNo,
        IntentKind::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::Scan => "scan",
            IntentKind::Cik => "cik",
            IntentKind::Log => "log",
            IntentKind::Help => "help",
            IntentKind::ConfirmYes => "confirm_yes",
            IntentKind::ConfirmNo => "confirm_no",
            IntentKind::None => "none",
        }
    }
}

impl FromStr for IntentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IntentKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown intent kind: {s}"))
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 10 位、左侧补零的 CIK 编号
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cik(String);

impl Cik {
    /// 接受 1–10 位 ASCII 数字，补零到 10 位；其它输入返回 None
    pub fn from_digits(digits: &str) -> Option<Self> {
        let digits = digits.trim();
        if digits.is_empty()
            || digits.len() > CIK_WIDTH
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        Some(Self(format!("{:0>width$}", digits, width = CIK_WIDTH)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cik {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 识别出的意图；只有 Cik 携带参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Scan,
    Cik(Cik),
    Log,
    Help,
    ConfirmYes,
    ConfirmNo,
    /// 未识别
    None,
}

impl Intent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Intent::Scan => IntentKind::Scan,
            Intent::Cik(_) => IntentKind::Cik,
            Intent::Log => IntentKind::Log,
            Intent::Help => IntentKind::Help,
            Intent::ConfirmYes => IntentKind::ConfirmYes,
            Intent::ConfirmNo => IntentKind::ConfirmNo,
            Intent::None => IntentKind::None,
        }
    }

    pub fn argument(&self) -> Option<&Cik> {
        match self {
            Intent::Cik(cik) => Some(cik),
            _ => None,
        }
    }
}
