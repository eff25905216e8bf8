//! 题库存储层（SQLite）
//!
//! 单连接 + `Mutex`，锁不会跨 `.await` 持有。
//! 多行写操作全部在事务中完成，失败即整体回滚。

pub mod queries;
pub mod schema;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::debug;

use crate::error::{LifecycleError, StoreError};
use crate::models::{
    DuplicateMatch, NewQuestion, PendingMatch, Question, QuestionId, QuestionStatus,
};

/// 题库存储
pub struct QuestionStore {
    path: Option<String>,
    connection: Mutex<Connection>,
}

impl QuestionStore {
    /// 打开（或创建）数据库文件
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn, Some(path.to_string_lossy().to_string()))
    }

    /// 内存数据库（测试用）
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<String>) -> Result<Self, StoreError> {
        schema::apply_pragmas(&conn)?;
        schema::create_tables(&conn)?;
        debug!("数据库已就绪: {}", path.as_deref().unwrap_or(":memory:"));
        Ok(Self {
            path,
            connection: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // 持锁线程 panic 不会留下半个事务（Transaction 在 drop 时回滚）
        self.connection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 在一个写事务中执行 `f`
    ///
    /// `f` 返回 `Err` 时回滚，返回 `Ok` 时提交
    pub fn transaction<T, E>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<rusqlite::Error>,
    {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// 插入新题目（状态固定为 DEDUPE_PENDING）
    pub fn insert_question(&self, new: &NewQuestion) -> Result<Question, StoreError> {
        Ok(queries::insert_question(&self.conn(), new)?)
    }

    pub fn get(&self, id: QuestionId) -> Result<Option<Question>, StoreError> {
        Ok(queries::get_question(&self.conn(), id)?)
    }

    pub fn find_by_ids(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StoreError> {
        Ok(queries::find_by_ids(&self.conn(), ids)?)
    }

    pub fn find_by_statuses(
        &self,
        statuses: &[QuestionStatus],
    ) -> Result<Vec<Question>, StoreError> {
        Ok(queries::find_by_statuses(&self.conn(), statuses)?)
    }

    pub fn list_with_status(&self, status: QuestionStatus) -> Result<Vec<Question>, StoreError> {
        Ok(queries::list_with_status(&self.conn(), status)?)
    }

    pub fn count_with_status(&self, status: QuestionStatus) -> Result<usize, StoreError> {
        Ok(queries::count_with_status(&self.conn(), status)?)
    }

    pub fn ancestor_chain(&self, id: QuestionId) -> Result<Vec<QuestionId>, StoreError> {
        Ok(queries::ancestor_chain(&self.conn(), id)?)
    }

    pub fn matches_for(&self, question_id: QuestionId) -> Result<Vec<DuplicateMatch>, StoreError> {
        Ok(queries::matches_for(&self.conn(), question_id)?)
    }

    /// 提交一次查重结果：写入全部匹配记录并更新目标题目状态
    ///
    /// 同一事务内完成，任一写入失败则全部回滚。
    /// 状态以事务内读到的行为准：题目不存在或已是 APPROVED 时拒绝写入。
    pub fn commit_check(
        &self,
        target_id: QuestionId,
        matches: &[PendingMatch],
        status: QuestionStatus,
    ) -> Result<Vec<DuplicateMatch>, LifecycleError> {
        self.transaction(|tx| {
            let current = queries::get_question(tx, target_id)?
                .ok_or_else(|| LifecycleError::NotFound(vec![target_id]))?;
            if !current.status.can_transition_to(status) {
                return Err(LifecycleError::InvalidTransition {
                    id: target_id,
                    from: current.status,
                    to: status,
                });
            }

            let mut written = Vec::with_capacity(matches.len());
            for pending in matches {
                written.push(queries::insert_match(tx, target_id, pending)?);
            }
            queries::update_status(tx, target_id, status)?;
            Ok(written)
        })
    }
}
