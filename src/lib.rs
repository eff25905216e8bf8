//! # Question Dedup
//!
//! 题库查重：新提交的题目与已入库题目做三层比对，
//! 给出 DUPLICATE / CONFLICT / PARENT_OF / CHILD_OF / PARALLEL_TO 结论，
//! 并维护题目之间的父子、平行关系与组卷校验。
//!
//! ## 架构设计
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 外部协作方：`Embedder`（向量）、`ReasoningEngine`（推理）
//!
//! ### ② 存储层（Store）
//! - `store/` - SQLite 题库，所有多行写操作在事务中完成
//!
//! ### ③ 业务能力层（Services）
//! - `SimilarityScorer` - 第一层：向量相似度
//! - `LexicalDisambiguator` - 第二层：词面 + 数字消歧
//! - `VerdictArbiter` - 第三层：推理引擎仲裁
//! - `RelationGraph` - 父子 / 平行关系
//! - `SelectionValidator` - 组卷校验
//! - `LifecycleService` - 送审、通过、统计
//!
//! ### ④ 流程层（Workflow）
//! - `DedupFlow` - 单题查重（候选池 → 三层判断 → 事务写库）
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量查重，管理并发和统计

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod store;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{Embedder, ReasoningEngine};
pub use config::{Config, DedupSettings};
pub use error::{AppError, AppResult};
pub use models::{
    DuplicateMatch, MatchRecord, NewQuestion, Question, QuestionId, QuestionStatus,
    RelationType, Verdict,
};
pub use orchestrator::{check_pending, App, BatchStats};
pub use services::{
    LifecycleService, LinkOutcome, RelationGraph, SelectionReport, SelectionValidator,
};
pub use store::QuestionStore;
pub use workflow::DedupFlow;
