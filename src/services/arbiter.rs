//! 第三层：推理引擎仲裁
//!
//! 把一对歧义题目交给推理引擎，得到 DUPLICATE / CONFLICT / PARENT_OF /
//! CHILD_OF / PARALLEL_TO / UNIQUE 之一。任何失败（网络、超时、无法解析）
//! 都降级为 ERROR，不落库、不影响状态。

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::clients::ReasoningEngine;
use crate::error::ArbiterError;
use crate::models::Verdict;

/// 仲裁结论
#[derive(Debug, Clone, PartialEq)]
pub struct Judgement {
    pub verdict: Verdict,
    pub reason: String,
}

impl Judgement {
    pub fn new(verdict: Verdict, reason: impl Into<String>) -> Self {
        Self {
            verdict,
            reason: reason.into(),
        }
    }
}

/// 推理引擎返回的 JSON 结构
#[derive(Debug, Deserialize)]
struct RawJudgement {
    verdict: Verdict,
    #[serde(default)]
    reason: String,
}

/// 仲裁器
pub struct VerdictArbiter {
    engine: Arc<dyn ReasoningEngine>,
    timeout: Duration,
}

impl VerdictArbiter {
    pub fn new(engine: Arc<dyn ReasoningEngine>, timeout: Duration) -> Self {
        Self { engine, timeout }
    }

    /// 仲裁一对题目；失败时返回 ERROR 结论，原因中带失败详情
    pub async fn arbitrate(&self, q1: &str, q2: &str) -> Judgement {
        match self.judge(q1, q2).await {
            Ok(judgement) => judgement,
            Err(e) => {
                warn!("仲裁失败: {}", e);
                Judgement::new(Verdict::Error, e.to_string())
            }
        }
    }

    /// 仲裁一对题目，保留具体错误类型
    pub async fn judge(&self, q1: &str, q2: &str) -> Result<Judgement, ArbiterError> {
        let prompt = build_prompt(q1, q2);

        let response = tokio::time::timeout(self.timeout, self.engine.complete(&prompt))
            .await
            .map_err(|_| ArbiterError::Timeout {
                secs: self.timeout.as_secs(),
            })??;

        debug!("推理引擎原始响应: {}", response);
        parse_judgement(&response)
    }
}

/// 构建仲裁提示词
fn build_prompt(q1: &str, q2: &str) -> String {
    format!(
        r#"Compare these two questions for logical identity.

Q1: {q1}
Q2: {q2}

Decide:
- DUPLICATE: For logical identity (even if words differ slightly)
- CONFLICT: Same question but with different answers or facts
- PARENT_OF: Q1 is a larger concept that fully contains Q2 (e.g., Q1: "Explain DBMS", Q2: "Define DBMS")
- CHILD_OF: Q1 is a subset/part of the larger concept in Q2
- PARALLEL_TO: Questions at the same level, alternative versions of similar topic (e.g., Q1: "TCP", Q2: "UDP")
- UNIQUE: Different topics or concepts

Return ONLY JSON:
{{"verdict":"DUPLICATE|CONFLICT|PARENT_OF|CHILD_OF|PARALLEL_TO|UNIQUE","reason":"brief explanation"}}"#
    )
}

/// 解析推理引擎的响应
///
/// 容忍代码块、前后说明文字，取第一个括号平衡的 `{...}` 片段后严格解码。
/// `verdict` 必须是六种结论之一（不接受 ERROR）。
pub fn parse_judgement(response: &str) -> Result<Judgement, ArbiterError> {
    if response.trim().is_empty() {
        return Err(ArbiterError::EmptyResponse);
    }

    let object = first_json_object(response).ok_or_else(|| ArbiterError::NoJsonObject {
        response: truncate(response, 200),
    })?;

    let raw: RawJudgement =
        serde_json::from_str(object).map_err(|e| ArbiterError::Schema(e.to_string()))?;

    if raw.verdict == Verdict::Error {
        return Err(ArbiterError::Schema("ERROR 不是有效的仲裁结论".to_string()));
    }

    Ok(Judgement {
        verdict: raw.verdict,
        reason: raw.reason.trim().to_string(),
    })
}

/// 第一个括号平衡的 `{...}` 片段（跳过 JSON 字符串内的括号）
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

fn truncate(text: &str, max_len: usize) -> String {
    crate::utils::logging::truncate_text(text, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedEngine(Result<&'static str, ()>);

    #[async_trait]
    impl ReasoningEngine for FixedEngine {
        async fn complete(&self, _prompt: &str) -> Result<String, ArbiterError> {
            match self.0 {
                Ok(text) => Ok(text.to_string()),
                Err(()) => Err(ArbiterError::transport("fake", "connection refused")),
            }
        }
    }

    struct SlowEngine;

    #[async_trait]
    impl ReasoningEngine for SlowEngine {
        async fn complete(&self, _prompt: &str) -> Result<String, ArbiterError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(r#"{"verdict":"DUPLICATE","reason":"late"}"#.to_string())
        }
    }

    fn arbiter(engine: impl ReasoningEngine + 'static) -> VerdictArbiter {
        VerdictArbiter::new(Arc::new(engine), Duration::from_millis(50))
    }

    #[test]
    fn test_parse_plain_json() {
        let j = parse_judgement(r#"{"verdict":"PARENT_OF","reason":"Q1 is broader"}"#).unwrap();
        assert_eq!(j, Judgement::new(Verdict::ParentOf, "Q1 is broader"));
    }

    #[test]
    fn test_parse_fenced_json_with_prose() {
        let response = "Sure! Here is my answer:\n```json\n{\"verdict\": \"PARALLEL_TO\", \"reason\": \"TCP vs UDP\"}\n```\nHope that helps {really}.";
        let j = parse_judgement(response).unwrap();
        assert_eq!(j.verdict, Verdict::ParallelTo);
        assert_eq!(j.reason, "TCP vs UDP");
    }

    #[test]
    fn test_parse_braces_inside_reason() {
        let response = r#"{"verdict":"CONFLICT","reason":"set {1,2} vs \"{3}\""} trailing }"#;
        let j = parse_judgement(response).unwrap();
        assert_eq!(j.verdict, Verdict::Conflict);
        assert_eq!(j.reason, r#"set {1,2} vs "{3}""#);
    }

    #[test]
    fn test_parse_missing_reason_defaults_empty() {
        let j = parse_judgement(r#"{"verdict":"UNIQUE"}"#).unwrap();
        assert_eq!(j, Judgement::new(Verdict::Unique, ""));
    }

    #[test]
    fn test_parse_rejects_unknown_verdict() {
        assert!(matches!(
            parse_judgement(r#"{"verdict":"MAYBE","reason":"?"}"#),
            Err(ArbiterError::Schema(_))
        ));
        assert!(matches!(
            parse_judgement(r#"{"verdict":"ERROR","reason":"?"}"#),
            Err(ArbiterError::Schema(_))
        ));
    }

    #[test]
    fn test_parse_without_object() {
        assert!(matches!(
            parse_judgement("I think they are duplicates."),
            Err(ArbiterError::NoJsonObject { .. })
        ));
        assert!(matches!(
            parse_judgement(r#"{"verdict":"DUPLICATE""#),
            Err(ArbiterError::NoJsonObject { .. })
        ));
        assert!(matches!(parse_judgement("  "), Err(ArbiterError::EmptyResponse)));
    }

    #[test]
    fn test_prompt_contains_both_questions() {
        let prompt = build_prompt("Explain DBMS", "Define DBMS");
        assert!(prompt.contains("Q1: Explain DBMS"));
        assert!(prompt.contains("Q2: Define DBMS"));
        assert!(prompt.contains(r#"{"verdict":"#));
    }

    #[tokio::test]
    async fn test_arbitrate_success() {
        let j = arbiter(FixedEngine(Ok(r#"{"verdict":"CHILD_OF","reason":"narrower"}"#)))
            .arbitrate("Define DBMS", "Explain DBMS")
            .await;
        assert_eq!(j.verdict, Verdict::ChildOf);
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_error_verdict() {
        let j = arbiter(FixedEngine(Err(()))).arbitrate("a", "b").await;
        assert_eq!(j.verdict, Verdict::Error);
        assert!(j.reason.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_garbage_response_becomes_error_verdict() {
        let j = arbiter(FixedEngine(Ok("no idea"))).arbitrate("a", "b").await;
        assert_eq!(j.verdict, Verdict::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_error_verdict() {
        let result = arbiter(SlowEngine).judge("a", "b").await;
        assert!(matches!(result, Err(ArbiterError::Timeout { .. })));
    }
}
