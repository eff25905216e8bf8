//! 组卷校验（只读）
//!
//! 规则：
//! 1. 父题和子题不能同时入选
//! 2. 同一平行组最多入选一道

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::warn;

use crate::error::StoreError;
use crate::models::{Question, QuestionId};
use crate::store::QuestionStore;

/// 校验结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionReport {
    pub valid: bool,
    pub conflicts: Vec<String>,
}

impl SelectionReport {
    pub fn into_tuple(self) -> (bool, Vec<String>) {
        (self.valid, self.conflicts)
    }
}

/// 组卷校验器
pub struct SelectionValidator {
    store: Arc<QuestionStore>,
}

impl SelectionValidator {
    pub fn new(store: Arc<QuestionStore>) -> Self {
        Self { store }
    }

    /// 校验一组题目 ID
    ///
    /// 重复 ID 只算一次；题库中不存在的 ID 被忽略（记录警告）
    pub fn validate_selection(&self, ids: &[QuestionId]) -> Result<SelectionReport, StoreError> {
        let mut seen = HashSet::new();
        let unique_ids: Vec<QuestionId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let found = self.store.find_by_ids(&unique_ids)?;
        let by_id: HashMap<QuestionId, Question> = found.into_iter().map(|q| (q.id, q)).collect();

        let mut selected = Vec::with_capacity(unique_ids.len());
        for id in &unique_ids {
            match by_id.get(id) {
                Some(q) => selected.push(q.clone()),
                None => warn!("组卷校验: 题目 #{} 不存在，已忽略", id),
            }
        }

        Ok(validate(&selected))
    }
}

/// 纯函数校验：冲突按入选顺序输出，先父子冲突，再平行组冲突
pub fn validate(selected: &[Question]) -> SelectionReport {
    let selected_ids: HashSet<QuestionId> = selected.iter().map(|q| q.id).collect();
    let mut conflicts = Vec::new();

    for q in selected {
        if let Some(parent_id) = q.parent_id {
            if selected_ids.contains(&parent_id) {
                conflicts.push(format!(
                    "Conflict: Question #{} (Child) and Question #{} (Parent) cannot both be selected.",
                    q.id, parent_id
                ));
            }
        }
    }

    let mut group_order: Vec<i64> = Vec::new();
    let mut groups: HashMap<i64, Vec<QuestionId>> = HashMap::new();
    for q in selected {
        if let Some(group_id) = q.parallel_group_id {
            groups
                .entry(group_id)
                .or_insert_with(|| {
                    group_order.push(group_id);
                    Vec::new()
                })
                .push(q.id);
        }
    }

    for group_id in group_order {
        let members = &groups[&group_id];
        if members.len() > 1 {
            let ids = members
                .iter()
                .map(|id| format!("#{}", id))
                .collect::<Vec<_>>()
                .join(", ");
            conflicts.push(format!(
                "Conflict: Questions {} are mutually exclusive (Parallel Group {}). Select only one.",
                ids, group_id
            ));
        }
    }

    SelectionReport {
        valid: conflicts.is_empty(),
        conflicts,
    }
}
