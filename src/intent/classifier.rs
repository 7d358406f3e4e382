//! LLM 兜底分类器
//!
//! 规则层没有命中时，把原始文本交给 LLM，要求按严格 JSON Schema 返回 {intent, arg}。
//! 结果用 ClassifierOutcome 显式区分成功 / 传输失败 / 输出不合法，不使用 panic 或错误冒泡做控制流。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{Cik, Intent, IntentKind};
use crate::llm::{JsonFormat, LlmClient, Message};

const SYSTEM_PROMPT: &str = "You classify Discord command intents for a SEC filing bot. \
Return strict JSON only with keys: intent,arg. \
Allowed intent: scan,cik,log,help,confirm_yes,confirm_no,none. \
arg should be a 10-digit cik only when intent=cik; else null.";

/// 分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifierOutcome {
    Recognized(Intent),
    /// 分类器不可达、超时或返回非成功状态
    TransportError(String),
    /// 输出不是合法 JSON、缺字段、intent 不在封闭集合内，或 cik 缺少合法参数
    MalformedOutput(String),
}

/// 分类器接口
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> ClassifierOutcome;
}

/// 模型返回的原始结构
#[derive(Debug, Deserialize)]
struct Verdict {
    intent: String,
    #[serde(default)]
    arg: Option<String>,
}

/// 基于 LlmClient 的分类器
pub struct LlmClassifier {
    llm: Arc<dyn LlmClient>,
    format: JsonFormat,
}

impl LlmClassifier {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            format: intent_format(),
        }
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(&self, text: &str) -> ClassifierOutcome {
        let messages = [Message::system(SYSTEM_PROMPT), Message::user(text)];
        match self.llm.complete_structured(&messages, &self.format).await {
            Ok(raw) => parse_verdict(&raw),
            Err(e) => ClassifierOutcome::TransportError(e.to_string()),
        }
    }
}

/// 分类输出的 JSON Schema：intent 为七选一，arg 为 10 位数字字符串或 null
fn intent_format() -> JsonFormat {
    let kinds: Vec<&str> = IntentKind::ALL.iter().map(|k| k.as_str()).collect();
    JsonFormat {
        name: "intent_schema".to_string(),
        description: Some("Command intent for the filing bot".to_string()),
        schema: json!({
            "type": "object",
            "properties": {
                "intent": { "type": "string", "enum": kinds },
                "arg": {
                    "anyOf": [
                        { "type": "string", "pattern": "^\\d{10}$" },
                        { "type": "null" }
                    ]
                }
            },
            "required": ["intent", "arg"],
            "additionalProperties": false
        }),
    }
}

fn parse_verdict(raw: &str) -> ClassifierOutcome {
    let verdict: Verdict = match serde_json::from_str(raw.trim()) {
        Ok(v) => v,
        Err(e) => return ClassifierOutcome::MalformedOutput(format!("invalid JSON: {e}")),
    };

    let kind: IntentKind = match verdict.intent.trim().parse() {
        Ok(k) => k,
        Err(e) => return ClassifierOutcome::MalformedOutput(e),
    };

    let intent = match kind {
        IntentKind::Cik => match verdict.arg.as_deref().and_then(Cik::from_digits) {
            Some(cik) => Intent::Cik(cik),
            None => {
                return ClassifierOutcome::MalformedOutput(format!(
                    "cik intent without a valid argument: {:?}",
                    verdict.arg
                ))
            }
        },
        IntentKind::Scan => Intent::Scan,
        IntentKind::Log => Intent::Log,
        IntentKind::Help => Intent::Help,
        IntentKind::ConfirmYes => Intent::ConfirmYes,
        IntentKind::ConfirmNo => Intent::ConfirmNo,
        IntentKind::None => Intent::None,
    };

    ClassifierOutcome::Recognized(intent)
}
