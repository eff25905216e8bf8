//! 单题查重流程 - 流程层
//!
//! 核心职责：定义"一道题"的完整查重流程
//!
//! 流程顺序：
//! 1. 候选池：APPROVED + DEDUPE_APPROVED，排除自身
//! 2. 第一层：向量相似度，保留 ≥ 阈值的候选
//! 3. 第二层：词面 + 数字，判断是否歧义
//! 4. 第三层：歧义的交给推理引擎，非歧义的直接记为 DUPLICATE
//! 5. 一个事务内写入匹配记录并更新状态

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clients::{Embedder, LlmClient, OpenAiEmbedder, ReasoningEngine};
use crate::config::{Config, DedupSettings};
use crate::error::{AppResult, LifecycleError};
use crate::models::{
    MatchRecord, PendingMatch, Question, QuestionId, QuestionStatus, Verdict,
};
use crate::services::{LexicalDisambiguator, SimilarityScorer, VerdictArbiter};
use crate::store::QuestionStore;
use crate::utils::logging::truncate_text;

/// 非歧义的高相似度匹配使用的理由
pub const HIGH_MATCH_REASON: &str = "high semantic and numeric match";

/// 单题查重流程
///
/// - 编排三层判断
/// - 只在最后一步写库
/// - 可在多个并发任务间共享（`Arc<DedupFlow>`）
pub struct DedupFlow {
    store: Arc<QuestionStore>,
    scorer: SimilarityScorer,
    disambiguator: LexicalDisambiguator,
    arbiter: VerdictArbiter,
    settings: DedupSettings,
}

impl DedupFlow {
    /// 用给定的协作方创建流程
    pub fn new(
        store: Arc<QuestionStore>,
        embedder: Arc<dyn Embedder>,
        engine: Arc<dyn ReasoningEngine>,
        settings: DedupSettings,
    ) -> Self {
        Self {
            store,
            scorer: SimilarityScorer::new(embedder),
            disambiguator: LexicalDisambiguator::new(&settings),
            arbiter: VerdictArbiter::new(
                engine,
                Duration::from_secs(settings.arbiter_timeout_secs),
            ),
            settings,
        }
    }

    /// 按配置创建流程（共享向量客户端 + OpenAI 兼容推理引擎）
    pub fn from_config(store: Arc<QuestionStore>, config: &Config) -> Self {
        let embedder: Arc<dyn Embedder> = OpenAiEmbedder::shared(config);
        let engine: Arc<dyn ReasoningEngine> = Arc::new(LlmClient::new(config));
        Self::new(store, embedder, engine, config.dedup.clone())
    }

    pub fn store(&self) -> &Arc<QuestionStore> {
        &self.store
    }

    /// 对一道题目执行完整查重
    ///
    /// 以题库中的当前行为准，传入的快照只用来取 ID。
    /// 返回写入的匹配记录（UNIQUE / ERROR 不在其中）。
    /// 有记录时题目变为 DUPLICATE_FLAGGED，否则变为 DEDUPE_APPROVED。
    pub async fn check_question(&self, target: &Question) -> AppResult<Vec<MatchRecord>> {
        self.check_by_id(target.id).await
    }

    /// 按 ID 查重
    pub async fn check_by_id(&self, id: QuestionId) -> AppResult<Vec<MatchRecord>> {
        let target = self
            .store
            .get(id)?
            .ok_or_else(|| LifecycleError::NotFound(vec![id]))?;

        // APPROVED 是终态；写库时事务内还会再检查一次
        if target.status == QuestionStatus::Approved {
            return Err(LifecycleError::InvalidTransition {
                id: target.id,
                from: target.status,
                to: QuestionStatus::DedupeApproved,
            }
            .into());
        }

        info!(
            "[题目 #{}] 🔍 开始查重: {}",
            target.id,
            truncate_text(&target.text, 50)
        );

        let pool: Vec<Question> = self
            .store
            .find_by_statuses(&QuestionStatus::CANDIDATE_POOL)?
            .into_iter()
            .filter(|q| q.id != target.id)
            .collect();

        if pool.is_empty() {
            info!("[题目 #{}] 候选池为空，直接通过", target.id);
            self.store
                .commit_check(target.id, &[], QuestionStatus::DedupeApproved)?;
            return Ok(Vec::new());
        }

        // ========== 第一层：向量相似度 ==========
        let texts: Vec<String> = pool.iter().map(|q| q.text.clone()).collect();
        let scores = self.scorer.score(&target.text, &texts).await?;

        let survivors: Vec<(&Question, f32)> = pool
            .iter()
            .zip(scores)
            .filter(|(_, score)| *score >= self.settings.similarity_threshold)
            .collect();
        debug!(
            "[题目 #{}] 候选 {} 个，相似度达标 {} 个",
            target.id,
            pool.len(),
            survivors.len()
        );

        // ========== 第二、三层 ==========
        let mut pending = Vec::new();
        for (candidate, score) in survivors {
            let report = self.disambiguator.assess(&target.text, &candidate.text, score);

            let (verdict, reason) = if report.ambiguous {
                debug!(
                    "[题目 #{}] 与 #{} 歧义 (向量 {:.2}, 词面 {:.2}, 数字一致: {})，交给仲裁",
                    target.id,
                    candidate.id,
                    score,
                    report.lexical_similarity,
                    report.numbers_match
                );
                let judgement = self.arbiter.arbitrate(&target.text, &candidate.text).await;
                (judgement.verdict, judgement.reason)
            } else {
                (Verdict::Duplicate, HIGH_MATCH_REASON.to_string())
            };

            if verdict.is_recorded() {
                info!(
                    "[题目 #{}] 与 #{} 判定为 {} ({:.2})",
                    target.id, candidate.id, verdict, score
                );
                pending.push(PendingMatch::new(candidate.id, score, verdict, reason));
            } else if verdict == Verdict::Error {
                warn!(
                    "[题目 #{}] 与 #{} 仲裁失败，忽略: {}",
                    target.id, candidate.id, reason
                );
            } else {
                info!("[题目 #{}] 与 #{} 判定为 {}，忽略", target.id, candidate.id, verdict);
            }
        }

        // ========== 写库 ==========
        let status = if pending.is_empty() {
            QuestionStatus::DedupeApproved
        } else {
            QuestionStatus::DuplicateFlagged
        };
        let written = self.store.commit_check(target.id, &pending, status)?;
        info!("[题目 #{}] ✓ 状态更新为 {}", target.id, status);

        let texts_by_id: HashMap<QuestionId, &str> =
            pool.iter().map(|q| (q.id, q.text.as_str())).collect();

        Ok(written
            .into_iter()
            .map(|m| MatchRecord {
                id: m.id,
                match_question_id: m.match_question_id,
                match_question_text: texts_by_id
                    .get(&m.match_question_id)
                    .map(|t| t.to_string())
                    .unwrap_or_default(),
                similarity_score: m.similarity_score,
                verdict: m.verdict,
                reason: m.reason,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, ArbiterError, EmbeddingError};
    use crate::models::NewQuestion;
    use async_trait::async_trait;

    /// 所有文本都映射到同一个向量
    struct SameVector;

    #[async_trait]
    impl Embedder for SameVector {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![1.0, 0.0])
        }
    }

    struct NeverCalled;

    #[async_trait]
    impl ReasoningEngine for NeverCalled {
        async fn complete(&self, _prompt: &str) -> Result<String, ArbiterError> {
            panic!("推理引擎不应被调用");
        }
    }

    fn flow(store: Arc<QuestionStore>) -> DedupFlow {
        DedupFlow::new(
            store,
            Arc::new(SameVector),
            Arc::new(NeverCalled),
            DedupSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_identical_wording_is_synthesized_duplicate() {
        let store = Arc::new(QuestionStore::open_in_memory().unwrap());
        let existing = store
            .insert_question(&NewQuestion::new("Explain the architecture of a DBMS."))
            .unwrap();
        store
            .commit_check(existing.id, &[], QuestionStatus::DedupeApproved)
            .unwrap();
        let target = store
            .insert_question(&NewQuestion::new("Explain the architecture of a DBMS?"))
            .unwrap();

        let records = flow(store.clone()).check_question(&target).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].verdict, Verdict::Duplicate);
        assert_eq!(records[0].reason, HIGH_MATCH_REASON);
        assert_eq!(records[0].similarity_score, 1.0);
        assert_eq!(records[0].match_question_text, existing.text);
        assert_eq!(
            store.get(target.id).unwrap().unwrap().status,
            QuestionStatus::DuplicateFlagged
        );
    }

    #[tokio::test]
    async fn test_pending_questions_are_not_candidates() {
        let store = Arc::new(QuestionStore::open_in_memory().unwrap());
        store.insert_question(&NewQuestion::new("Define DBMS.")).unwrap();
        let target = store.insert_question(&NewQuestion::new("Define DBMS.")).unwrap();

        let records = flow(store.clone()).check_question(&target).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(
            store.get(target.id).unwrap().unwrap().status,
            QuestionStatus::DedupeApproved
        );
    }

    #[tokio::test]
    async fn test_approved_target_is_refused() {
        let store = Arc::new(QuestionStore::open_in_memory().unwrap());
        let q = store.insert_question(&NewQuestion::new("Define DBMS.")).unwrap();
        store.commit_check(q.id, &[], QuestionStatus::DedupeApproved).unwrap();
        crate::services::LifecycleService::new(store.clone())
            .approve(&[q.id])
            .unwrap();
        let approved = store.get(q.id).unwrap().unwrap();

        let err = flow(store.clone()).check_question(&approved).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Lifecycle(LifecycleError::InvalidTransition { .. })
        ));
        assert!(store.matches_for(q.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_check_by_missing_id() {
        let store = Arc::new(QuestionStore::open_in_memory().unwrap());
        let err = flow(store).check_by_id(42).await.unwrap_err();
        assert!(matches!(err, AppError::Lifecycle(LifecycleError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stale_snapshot_cannot_demote_approved_question() {
        let store = Arc::new(QuestionStore::open_in_memory().unwrap());
        let q = store.insert_question(&NewQuestion::new("Define DBMS.")).unwrap();
        let snapshot = store.get(q.id).unwrap().unwrap();

        let lifecycle = crate::services::LifecycleService::new(store.clone());
        lifecycle.submit_for_review(&[q.id]).unwrap();
        lifecycle.approve(&[q.id]).unwrap();

        // 快照里仍是 DEDUPE_PENDING
        assert_eq!(snapshot.status, QuestionStatus::DedupePending);
        let err = flow(store.clone()).check_question(&snapshot).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Lifecycle(LifecycleError::InvalidTransition {
                from: QuestionStatus::Approved,
                ..
            })
        ));
        assert_eq!(store.get(q.id).unwrap().unwrap().status, QuestionStatus::Approved);
    }

    /// 仲裁期间题目被人工通过
    struct ApprovesDuringCall {
        store: Arc<QuestionStore>,
        target_id: QuestionId,
    }

    #[async_trait]
    impl ReasoningEngine for ApprovesDuringCall {
        async fn complete(&self, _prompt: &str) -> Result<String, ArbiterError> {
            let lifecycle = crate::services::LifecycleService::new(self.store.clone());
            lifecycle.submit_for_review(&[self.target_id]).unwrap();
            lifecycle.approve(&[self.target_id]).unwrap();
            Ok(r#"{"verdict":"CONFLICT","reason":"different operands"}"#.to_string())
        }
    }

    #[tokio::test]
    async fn test_approval_during_check_is_kept() {
        let store = Arc::new(QuestionStore::open_in_memory().unwrap());
        let existing = store
            .insert_question(&NewQuestion::new("What is 2 + 2?"))
            .unwrap();
        store
            .commit_check(existing.id, &[], QuestionStatus::DedupeApproved)
            .unwrap();
        let target = store
            .insert_question(&NewQuestion::new("What is 2 + 3?"))
            .unwrap();

        let engine = ApprovesDuringCall {
            store: store.clone(),
            target_id: target.id,
        };
        let flow = DedupFlow::new(
            store.clone(),
            Arc::new(SameVector),
            Arc::new(engine),
            DedupSettings::default(),
        );

        let err = flow.check_question(&target).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Lifecycle(LifecycleError::InvalidTransition { .. })
        ));
        assert_eq!(
            store.get(target.id).unwrap().unwrap().status,
            QuestionStatus::Approved
        );
        assert!(store.matches_for(target.id).unwrap().is_empty());
    }
}
