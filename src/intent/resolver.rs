//! 意图解析器：规则优先，分类器兜底
//!
//! 对会话状态是纯函数；唯一的副作用是可选的分类器网络调用，失败时静默降级为 Intent::None。

use std::sync::Arc;

use super::{match_rules, Classifier, ClassifierOutcome, Intent};

/// 意图解析器
#[derive(Clone, Default)]
pub struct IntentResolver {
    classifier: Option<Arc<dyn Classifier>>,
}

impl IntentResolver {
    /// 仅规则，不调用分类器
    pub fn rules_only() -> Self {
        Self { classifier: None }
    }

    pub fn with_classifier(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier: Some(classifier),
        }
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    /// 解析一条消息文本
    pub async fn resolve(&self, text: &str) -> Intent {
        let normalized = text.trim().to_lowercase();
        if normalized.is_empty() {
            return Intent::None;
        }

        if let Some(intent) = match_rules(&normalized) {
            return intent;
        }

        let Some(classifier) = &self.classifier else {
            return Intent::None;
        };

        match classifier.classify(text).await {
            ClassifierOutcome::Recognized(intent) => {
                tracing::debug!(kind = %intent.kind(), "Classifier resolved intent");
                intent
            }
            ClassifierOutcome::TransportError(e) => {
                tracing::warn!("Classifier unavailable, treating as no intent: {}", e);
                Intent::None
            }
            ClassifierOutcome::MalformedOutput(e) => {
                tracing::warn!("Classifier returned malformed output, treating as no intent: {}", e);
                Intent::None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{Cik, LlmClassifier};
    use crate::llm::{LlmError, MockLlmClient};

    fn with_mock(mock: Arc<MockLlmClient>) -> IntentResolver {
        IntentResolver::with_classifier(Arc::new(LlmClassifier::new(mock)))
    }

    #[tokio::test]
    async fn test_cik_scenario() {
        let intent = IntentResolver::rules_only().resolve("cik 320193").await;
        assert_eq!(intent, Intent::Cik(Cik::from_digits("0000320193").unwrap()));
        assert_eq!(intent.argument().unwrap().as_str(), "0000320193");
    }

    #[tokio::test]
    async fn test_normalizes_case_and_whitespace() {
        let resolver = IntentResolver::rules_only();
        assert_eq!(resolver.resolve("  YES \n").await, Intent::ConfirmYes);
        assert_eq!(resolver.resolve("CIK 42").await.argument().unwrap().as_str(), "0000000042");
        assert_eq!(resolver.resolve("Scan RSS").await, Intent::Scan);
    }

    #[tokio::test]
    async fn test_empty_text_skips_classifier() {
        let mock = Arc::new(MockLlmClient::replying(r#"{"intent":"scan","arg":null}"#));
        let resolver = with_mock(mock.clone());
        assert_eq!(resolver.resolve("   ").await, Intent::None);
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_confirmation_tokens_never_reach_classifier() {
        let mock = Arc::new(MockLlmClient::replying(r#"{"intent":"scan","arg":null}"#));
        let resolver = with_mock(mock.clone());
        for t in ["yes", "Y", "confirm", "go", "here we go"] {
            assert_eq!(resolver.resolve(t).await, Intent::ConfirmYes, "{t}");
        }
        for t in ["no", "N", "cancel", "STOP"] {
            assert_eq!(resolver.resolve(t).await, Intent::ConfirmNo, "{t}");
        }
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_classifier_handles_natural_language() {
        let mock = Arc::new(MockLlmClient::replying(r#"{"intent":"cik","arg":"0000789019"}"#));
        let resolver = with_mock(mock.clone());
        let intent = resolver.resolve("pull the filings for microsoft please").await;
        assert_eq!(intent, Intent::Cik(Cik::from_digits("789019").unwrap()));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_classifier_failures_degrade_to_none() {
        let transport = with_mock(Arc::new(MockLlmClient::failing(LlmError::Transport(
            "connection refused".into(),
        ))));
        assert_eq!(transport.resolve("do the thing").await, Intent::None);

        let malformed = with_mock(Arc::new(MockLlmClient::replying("{not json")));
        assert_eq!(malformed.resolve("do the thing").await, Intent::None);

        let unknown = with_mock(Arc::new(MockLlmClient::replying(
            r#"{"intent":"delete_everything","arg":null}"#,
        )));
        assert_eq!(unknown.resolve("do the thing").await, Intent::None);
    }

    #[tokio::test]
    async fn test_without_classifier_unmatched_is_none() {
        assert_eq!(IntentResolver::rules_only().resolve("good morning").await, Intent::None);
    }
}
