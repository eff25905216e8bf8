//! 关系图管理
//!
//! 维护两类关系：
//! - 父子（`parent_id`）：有向无环，写入前沿目标的祖先链检查环
//! - 平行（`parallel_group_id`）：等价类，合并时整组迁移
//!
//! 每次 `link` 是一个事务：检查与写入要么全部生效，要么全部不生效。

use std::sync::Arc;

use rusqlite::Connection;
use tracing::info;

use crate::error::RelationError;
use crate::models::{DuplicateMatch, Question, QuestionId, RelationType, Verdict};
use crate::store::{queries, QuestionStore};

/// `link` 成功后的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// `child` 的父题被设置为 `parent`
    Parented { child: QuestionId, parent: QuestionId },
    /// 两道题处于同一平行组；`merged` 为从另一组迁移过来的成员数
    Grouped { group_id: i64, merged: usize },
    /// 两道题本来就在同一平行组
    AlreadyGrouped { group_id: i64 },
}

/// 关系图管理器
pub struct RelationGraph {
    store: Arc<QuestionStore>,
}

impl RelationGraph {
    pub fn new(store: Arc<QuestionStore>) -> Self {
        Self { store }
    }

    /// 建立关系
    ///
    /// - `Child`：`question_id` 成为 `target_id` 的子题
    /// - `Parallel`：两者进入同一平行组
    pub fn link(
        &self,
        question_id: QuestionId,
        target_id: QuestionId,
        relation: RelationType,
    ) -> Result<LinkOutcome, RelationError> {
        let outcome = self.store.transaction(|tx| match relation {
            RelationType::Child => link_child(tx, question_id, target_id),
            RelationType::Parallel => link_parallel(tx, question_id, target_id),
        })?;

        info!("🔗 关联 #{} → #{} ({:?}): {:?}", question_id, target_id, relation, outcome);
        Ok(outcome)
    }

    /// 把一条查重匹配记录采纳为关系
    ///
    /// - PARENT_OF：被检查题目是父题，对比题目成为它的子题
    /// - CHILD_OF：被检查题目成为对比题目的子题
    /// - PARALLEL_TO：两者进入同一平行组
    pub fn link_from_match(&self, m: &DuplicateMatch) -> Result<LinkOutcome, RelationError> {
        match m.verdict {
            Verdict::ParentOf => self.link(m.match_question_id, m.question_id, RelationType::Child),
            Verdict::ChildOf => self.link(m.question_id, m.match_question_id, RelationType::Child),
            Verdict::ParallelTo => {
                self.link(m.question_id, m.match_question_id, RelationType::Parallel)
            }
            other => Err(RelationError::NotARelation(other)),
        }
    }
}

fn require(conn: &Connection, id: QuestionId) -> Result<Question, RelationError> {
    queries::get_question(conn, id)?.ok_or(RelationError::NotFound(id))
}

fn link_child(
    conn: &Connection,
    question_id: QuestionId,
    target_id: QuestionId,
) -> Result<LinkOutcome, RelationError> {
    require(conn, question_id)?;
    require(conn, target_id)?;

    // 目标自身加上它的全部祖先；question 出现在其中即成环
    let mut chain = vec![target_id];
    chain.extend(queries::ancestor_chain(conn, target_id)?);
    if chain.contains(&question_id) {
        return Err(RelationError::Cycle {
            question_id,
            target_id,
        });
    }

    queries::set_parent(conn, question_id, Some(target_id))?;
    Ok(LinkOutcome::Parented {
        child: question_id,
        parent: target_id,
    })
}

fn link_parallel(
    conn: &Connection,
    question_id: QuestionId,
    target_id: QuestionId,
) -> Result<LinkOutcome, RelationError> {
    if question_id == target_id {
        return Err(RelationError::SelfLink(question_id));
    }
    let question = require(conn, question_id)?;
    let target = require(conn, target_id)?;

    let outcome = match (question.parallel_group_id, target.parallel_group_id) {
        (None, None) => {
            let group_id = queries::next_group_id(conn)?;
            queries::set_group(conn, question_id, group_id)?;
            queries::set_group(conn, target_id, group_id)?;
            LinkOutcome::Grouped {
                group_id,
                merged: 0,
            }
        }
        (Some(group_id), None) => {
            queries::set_group(conn, target_id, group_id)?;
            LinkOutcome::Grouped {
                group_id,
                merged: 0,
            }
        }
        (None, Some(group_id)) => {
            queries::set_group(conn, question_id, group_id)?;
            LinkOutcome::Grouped {
                group_id,
                merged: 0,
            }
        }
        (Some(first), Some(second)) if first == second => {
            LinkOutcome::AlreadyGrouped { group_id: first }
        }
        (Some(first), Some(second)) => {
            let merged = queries::merge_group(conn, second, first)?;
            LinkOutcome::Grouped {
                group_id: first,
                merged,
            }
        }
    };

    Ok(outcome)
}
