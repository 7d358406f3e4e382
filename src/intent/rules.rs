//! 确定性规则层（不调用 LLM）
//!
//! 优先级：cik <数字> > 关键词（scan / log / help，子串匹配）> 精确确认词。

use std::sync::OnceLock;

use regex::Regex;

use super::{Cik, Intent};

const SCAN_KEYWORDS: &[&str] = &["scan", "rss", "scan-rss-feed"];
const LOG_KEYWORDS: &[&str] = &["log", "export", "state.json"];
const HELP_KEYWORDS: &[&str] = &["help", "menu", "what can you do"];
const YES_TOKENS: &[&str] = &["yes", "y", "confirm", "go", "here we go"];
const NO_TOKENS: &[&str] = &["no", "n", "cancel", "stop"];

static CIK_RE: OnceLock<Regex> = OnceLock::new();

fn cik_regex() -> &'static Regex {
    CIK_RE.get_or_init(|| Regex::new(r"\bcik\s*([0-9]{1,10})\b").expect("valid cik regex"))
}

/// 对已规范化（trim + 小写）的文本执行规则匹配；未命中返回 None，交给分类器
pub fn match_rules(normalized: &str) -> Option<Intent> {
    if let Some(digits) = cik_regex().captures(normalized).and_then(|c| c.get(1)) {
        if let Some(cik) = Cik::from_digits(digits.as_str()) {
            return Some(Intent::Cik(cik));
        }
    }

    let contains_any = |words: &[&str]| words.iter().any(|w| normalized.contains(w));
    if contains_any(SCAN_KEYWORDS) {
        return Some(Intent::Scan);
    }
    if contains_any(LOG_KEYWORDS) {
        return Some(Intent::Log);
    }
    if contains_any(HELP_KEYWORDS) {
        return Some(Intent::Help);
    }

    if YES_TOKENS.contains(&normalized) {
        return Some(Intent::ConfirmYes);
    }
    if NO_TOKENS.contains(&normalized) {
        return Some(Intent::ConfirmNo);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cik(digits: &str) -> Intent {
        Intent::Cik(Cik::from_digits(digits).unwrap())
    }

    #[test]
    fn test_cik_pattern() {
        assert_eq!(match_rules("cik 320193"), Some(cik("320193")));
        assert_eq!(match_rules("cik320193"), Some(cik("320193")));
        assert_eq!(match_rules("please fetch cik 0000320193 now"), Some(cik("320193")));
        assert_eq!(match_rules("cik 1").unwrap().argument().unwrap().as_str(), "0000000001");
    }

    #[test]
    fn test_cik_must_be_whole_word() {
        // 11 位数字不是合法 CIK，落到其它规则（此处无命中）
        assert_eq!(match_rules("cik 12345678901"), None);
        assert_eq!(match_rules("tacik 123"), None);
    }

    #[test]
    fn test_cik_accepts_ascii_digits_only() {
        assert_eq!(match_rules("cik ١٢٣"), None);
        assert_eq!(match_rules("cik ١٢٣ or cik 320193"), Some(cik("320193")));
    }

    #[test]
    fn test_cik_beats_keywords() {
        assert_eq!(match_rules("scan cik 42"), Some(cik("42")));
    }

    #[test]
    fn test_keyword_priority() {
        assert_eq!(match_rules("scan rss"), Some(Intent::Scan));
        assert_eq!(match_rules("run scan-rss-feed"), Some(Intent::Scan));
        assert_eq!(match_rules("export the state.json"), Some(Intent::Log));
        assert_eq!(match_rules("scan and export"), Some(Intent::Scan));
        assert_eq!(match_rules("show me the menu"), Some(Intent::Help));
        assert_eq!(match_rules("what can you do"), Some(Intent::Help));
    }

    #[test]
    fn test_confirmation_tokens_are_exact() {
        for t in YES_TOKENS {
            assert_eq!(match_rules(t), Some(Intent::ConfirmYes), "{t}");
        }
        for t in NO_TOKENS {
            assert_eq!(match_rules(t), Some(Intent::ConfirmNo), "{t}");
        }
        assert_eq!(match_rules("yes please"), None);
        assert_eq!(match_rules("nope"), None);
    }

    #[test]
    fn test_unmatched() {
        assert_eq!(match_rules("good morning"), None);
    }
}
