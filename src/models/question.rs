use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 题目 ID（由存储层分配）
pub type QuestionId = i64;

/// 题目生命周期状态
///
/// ```text
/// DEDUPE_PENDING ──submit──▶ DEDUPE_APPROVED ──approve──▶ APPROVED
///        │                        ▲   │                      ▲
///        └──check (无匹配)─────────┘   │                      │
///        └──check (有匹配)──▶ DUPLICATE_FLAGGED ──approve─────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionStatus {
    /// 新提交，等待查重
    DedupePending,
    /// 查重通过（或人工送审）
    DedupeApproved,
    /// 查重发现重复 / 冲突 / 关联
    DuplicateFlagged,
    /// 最终通过（终态）
    Approved,
}

impl QuestionStatus {
    /// 所有状态（用于统计）
    pub const ALL: [QuestionStatus; 4] = [
        QuestionStatus::DedupePending,
        QuestionStatus::DedupeApproved,
        QuestionStatus::DuplicateFlagged,
        QuestionStatus::Approved,
    ];

    /// 查重候选池包含的状态
    pub const CANDIDATE_POOL: [QuestionStatus; 2] =
        [QuestionStatus::Approved, QuestionStatus::DedupeApproved];

    /// 数据库中的存储值
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionStatus::DedupePending => "DEDUPE_PENDING",
            QuestionStatus::DedupeApproved => "DEDUPE_APPROVED",
            QuestionStatus::DuplicateFlagged => "DUPLICATE_FLAGGED",
            QuestionStatus::Approved => "APPROVED",
        }
    }

    /// 从存储值解析
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DEDUPE_PENDING" => Some(QuestionStatus::DedupePending),
            "DEDUPE_APPROVED" => Some(QuestionStatus::DedupeApproved),
            "DUPLICATE_FLAGGED" => Some(QuestionStatus::DuplicateFlagged),
            "APPROVED" => Some(QuestionStatus::Approved),
            _ => None,
        }
    }

    /// 是否允许迁移到 `next`
    ///
    /// 查重结果（DEDUPE_APPROVED / DUPLICATE_FLAGGED）可以互相覆盖，
    /// 因为重新查重会从头计算。APPROVED 是终态。
    pub fn can_transition_to(self, next: QuestionStatus) -> bool {
        use QuestionStatus::*;
        match (self, next) {
            (Approved, _) => false,
            (DedupePending, DedupeApproved | DuplicateFlagged) => true,
            (DedupeApproved, DuplicateFlagged | Approved) => true,
            (DuplicateFlagged, DedupeApproved | Approved) => true,
            (DedupeApproved, DedupeApproved) | (DuplicateFlagged, DuplicateFlagged) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for QuestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 题目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub status: QuestionStatus,
    /// 父题（弱引用，不拥有）
    pub parent_id: Option<QuestionId>,
    /// 平行组（互斥组）成员标识
    pub parallel_group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Bloom 层级，只透传不参与判断
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bloom_level: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 新题目（外部提交流程创建）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewQuestion {
    pub text: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub bloom_level: Option<String>,
}

impl NewQuestion {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// 两道题比较的结论
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Duplicate,
    Conflict,
    ParentOf,
    ChildOf,
    ParallelTo,
    Unique,
    Error,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Duplicate => "DUPLICATE",
            Verdict::Conflict => "CONFLICT",
            Verdict::ParentOf => "PARENT_OF",
            Verdict::ChildOf => "CHILD_OF",
            Verdict::ParallelTo => "PARALLEL_TO",
            Verdict::Unique => "UNIQUE",
            Verdict::Error => "ERROR",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DUPLICATE" => Some(Verdict::Duplicate),
            "CONFLICT" => Some(Verdict::Conflict),
            "PARENT_OF" => Some(Verdict::ParentOf),
            "CHILD_OF" => Some(Verdict::ChildOf),
            "PARALLEL_TO" => Some(Verdict::ParallelTo),
            "UNIQUE" => Some(Verdict::Unique),
            "ERROR" => Some(Verdict::Error),
            _ => None,
        }
    }

    /// 是否需要写入匹配记录（UNIQUE / ERROR 不落库）
    pub fn is_recorded(self) -> bool {
        !matches!(self, Verdict::Unique | Verdict::Error)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 已落库的匹配记录（写入后不可变）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateMatch {
    pub id: i64,
    /// 被检查的题目
    pub question_id: QuestionId,
    /// 对比的已有题目
    pub match_question_id: QuestionId,
    /// 相似度，保留两位小数
    pub similarity_score: f64,
    pub verdict: Verdict,
    pub reason: String,
}

/// 待写入的匹配（查重过程中产生，事务提交时落库）
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMatch {
    pub match_question_id: QuestionId,
    pub similarity_score: f64,
    pub verdict: Verdict,
    pub reason: String,
}

impl PendingMatch {
    pub fn new(
        match_question_id: QuestionId,
        raw_score: f32,
        verdict: Verdict,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            match_question_id,
            similarity_score: round_score(raw_score),
            verdict,
            reason: reason.into(),
        }
    }
}

/// `check_question` 的返回项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: i64,
    pub match_question_id: QuestionId,
    pub match_question_text: String,
    pub similarity_score: f64,
    pub verdict: Verdict,
    pub reason: String,
}

/// 手动关联的关系类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    /// question 成为 target 的子题
    Child,
    /// question 与 target 互斥（平行）
    Parallel,
}

/// 相似度保留两位小数
pub fn round_score(score: f32) -> f64 {
    (f64::from(score) * 100.0).round() / 100.0
}
