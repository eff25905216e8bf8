//! 行级查询
//!
//! 所有函数都接收 `&Connection`，因此既能直接用于连接，
//! 也能在 `rusqlite::Transaction`（解引用为 `Connection`）中使用。

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::error::StoreError;
use crate::models::{
    DuplicateMatch, NewQuestion, PendingMatch, Question, QuestionId, QuestionStatus, Verdict,
};

const QUESTION_COLUMNS: &str =
    "id, question_text, status, parent_id, parallel_group_id, subject, topic, bloom_level, created_at";

fn decode_error(column: &'static str, value: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(StoreError::Decode { column, value }),
    )
}

fn question_from_row(row: &Row<'_>) -> rusqlite::Result<Question> {
    let status: String = row.get(2)?;
    let created_at: String = row.get(8)?;
    Ok(Question {
        id: row.get(0)?,
        text: row.get(1)?,
        status: QuestionStatus::parse(&status).ok_or_else(|| decode_error("status", status))?,
        parent_id: row.get(3)?,
        parallel_group_id: row.get(4)?,
        subject: row.get(5)?,
        topic: row.get(6)?,
        bloom_level: row.get(7)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| decode_error("created_at", created_at))?,
    })
}

fn match_from_row(row: &Row<'_>) -> rusqlite::Result<DuplicateMatch> {
    let verdict: String = row.get(4)?;
    Ok(DuplicateMatch {
        id: row.get(0)?,
        question_id: row.get(1)?,
        match_question_id: row.get(2)?,
        similarity_score: row.get(3)?,
        verdict: Verdict::parse(&verdict).ok_or_else(|| decode_error("verdict", verdict))?,
        reason: row.get(5)?,
    })
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

pub fn insert_question(conn: &Connection, new: &NewQuestion) -> rusqlite::Result<Question> {
    let created_at = Utc::now();
    conn.execute(
        "INSERT INTO questions (question_text, status, subject, topic, bloom_level, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            new.text,
            QuestionStatus::DedupePending.as_str(),
            new.subject,
            new.topic,
            new.bloom_level,
            created_at.to_rfc3339(),
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_question(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn get_question(conn: &Connection, id: QuestionId) -> rusqlite::Result<Option<Question>> {
    conn.query_row(
        &format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?1"),
        params![id],
        question_from_row,
    )
    .optional()
}

/// 按 ID 集合查询，结果按 ID 升序；不存在的 ID 被忽略
pub fn find_by_ids(conn: &Connection, ids: &[QuestionId]) -> rusqlite::Result<Vec<Question>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE id IN ({}) ORDER BY id",
        placeholders(ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(ids.iter()), question_from_row)?;
    rows.collect()
}

/// 按状态集合查询，结果按 ID 升序
pub fn find_by_statuses(
    conn: &Connection,
    statuses: &[QuestionStatus],
) -> rusqlite::Result<Vec<Question>> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE status IN ({}) ORDER BY id",
        placeholders(statuses.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params_from_iter(statuses.iter().map(|s| s.as_str())),
        question_from_row,
    )?;
    rows.collect()
}

/// 按状态查询，最新的在前
pub fn list_with_status(
    conn: &Connection,
    status: QuestionStatus,
) -> rusqlite::Result<Vec<Question>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE status = ?1 ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map(params![status.as_str()], question_from_row)?;
    rows.collect()
}

pub fn count_with_status(conn: &Connection, status: QuestionStatus) -> rusqlite::Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM questions WHERE status = ?1",
        params![status.as_str()],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

pub fn update_status(
    conn: &Connection,
    id: QuestionId,
    status: QuestionStatus,
) -> rusqlite::Result<bool> {
    let updated = conn.execute(
        "UPDATE questions SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    Ok(updated > 0)
}

pub fn set_parent(
    conn: &Connection,
    id: QuestionId,
    parent_id: Option<QuestionId>,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE questions SET parent_id = ?1 WHERE id = ?2",
        params![parent_id, id],
    )?;
    Ok(())
}

pub fn set_group(conn: &Connection, id: QuestionId, group_id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE questions SET parallel_group_id = ?1 WHERE id = ?2",
        params![group_id, id],
    )?;
    Ok(())
}

/// 把 `from` 组的全部成员并入 `into` 组，返回迁移的行数
pub fn merge_group(conn: &Connection, from: i64, into: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE questions SET parallel_group_id = ?1 WHERE parallel_group_id = ?2",
        params![into, from],
    )
}

pub fn next_group_id(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(parallel_group_id), 0) + 1 FROM questions",
        [],
        |row| row.get(0),
    )
}

/// 沿 `parent_id` 向上遍历，返回祖先链（不含自身，近的在前）
///
/// 遇到已访问节点即停止，数据中即使存在环也不会死循环
pub fn ancestor_chain(conn: &Connection, id: QuestionId) -> rusqlite::Result<Vec<QuestionId>> {
    let mut chain = Vec::new();
    let mut seen = HashSet::from([id]);
    let mut current = id;

    loop {
        let parent: Option<QuestionId> = conn
            .query_row(
                "SELECT parent_id FROM questions WHERE id = ?1",
                params![current],
                |row| row.get(0),
            )
            .optional()?
            .flatten();

        match parent {
            Some(parent_id) if seen.insert(parent_id) => {
                chain.push(parent_id);
                current = parent_id;
            }
            _ => break,
        }
    }

    Ok(chain)
}

pub fn insert_match(
    conn: &Connection,
    question_id: QuestionId,
    pending: &PendingMatch,
) -> rusqlite::Result<DuplicateMatch> {
    conn.execute(
        "INSERT INTO duplicate_matches (question_id, match_question_id, similarity_score, verdict, reason, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            question_id,
            pending.match_question_id,
            pending.similarity_score,
            pending.verdict.as_str(),
            pending.reason,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(DuplicateMatch {
        id: conn.last_insert_rowid(),
        question_id,
        match_question_id: pending.match_question_id,
        similarity_score: pending.similarity_score,
        verdict: pending.verdict,
        reason: pending.reason.clone(),
    })
}

pub fn matches_for(conn: &Connection, question_id: QuestionId) -> rusqlite::Result<Vec<DuplicateMatch>> {
    let mut stmt = conn.prepare(
        "SELECT id, question_id, match_question_id, similarity_score, verdict, reason
         FROM duplicate_matches WHERE question_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![question_id], match_from_row)?;
    rows.collect()
}
