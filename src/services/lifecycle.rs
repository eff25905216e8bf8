//! 题目状态流转（人工操作）
//!
//! 查重流程自己只写 DEDUPE_APPROVED / DUPLICATE_FLAGGED；
//! 这里是外部动作：送审、人工通过、统计。

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::error::{LifecycleError, StoreError};
use crate::models::{Question, QuestionId, QuestionStatus};
use crate::store::{queries, QuestionStore};

/// 各状态题目数量
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub dedupe_pending: usize,
    pub dedupe_approved: usize,
    pub duplicate_flagged: usize,
    pub approved: usize,
}

/// 状态流转服务
pub struct LifecycleService {
    store: Arc<QuestionStore>,
}

impl LifecycleService {
    pub fn new(store: Arc<QuestionStore>) -> Self {
        Self { store }
    }

    /// 送审：DEDUPE_PENDING → DEDUPE_APPROVED
    pub fn submit_for_review(&self, ids: &[QuestionId]) -> Result<usize, LifecycleError> {
        self.transition(ids, QuestionStatus::DedupeApproved, &[QuestionStatus::DedupePending])
    }

    /// 人工通过：DEDUPE_APPROVED / DUPLICATE_FLAGGED → APPROVED
    pub fn approve(&self, ids: &[QuestionId]) -> Result<usize, LifecycleError> {
        self.transition(
            ids,
            QuestionStatus::Approved,
            &[QuestionStatus::DedupeApproved, QuestionStatus::DuplicateFlagged],
        )
    }

    /// 看板统计
    pub fn status_counts(&self) -> Result<StatusCounts, StoreError> {
        Ok(StatusCounts {
            dedupe_pending: self.store.count_with_status(QuestionStatus::DedupePending)?,
            dedupe_approved: self.store.count_with_status(QuestionStatus::DedupeApproved)?,
            duplicate_flagged: self.store.count_with_status(QuestionStatus::DuplicateFlagged)?,
            approved: self.store.count_with_status(QuestionStatus::Approved)?,
        })
    }

    /// 某状态下的题目，最新的在前
    pub fn questions_with_status(&self, status: QuestionStatus) -> Result<Vec<Question>, StoreError> {
        self.store.list_with_status(status)
    }

    /// 批量迁移：任一题目不存在或不允许迁移，则整批不生效
    fn transition(
        &self,
        ids: &[QuestionId],
        to: QuestionStatus,
        allowed_from: &[QuestionStatus],
    ) -> Result<usize, LifecycleError> {
        let mut seen = HashSet::new();
        let unique_ids: Vec<QuestionId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let count = self.store.transaction(|tx| {
            let questions = queries::find_by_ids(tx, &unique_ids)?;
            if questions.is_empty() || questions.len() < unique_ids.len() {
                let found: HashSet<QuestionId> = questions.iter().map(|q| q.id).collect();
                let missing = unique_ids
                    .iter()
                    .copied()
                    .filter(|id| !found.contains(id))
                    .collect();
                return Err(LifecycleError::NotFound(missing));
            }

            for q in &questions {
                if !allowed_from.contains(&q.status) || !q.status.can_transition_to(to) {
                    return Err(LifecycleError::InvalidTransition {
                        id: q.id,
                        from: q.status,
                        to,
                    });
                }
            }

            for q in &questions {
                queries::update_status(tx, q.id, to)?;
            }
            Ok(questions.len())
        })?;

        info!("✓ {} 道题目已迁移到 {}", count, to);
        Ok(count)
    }
}
