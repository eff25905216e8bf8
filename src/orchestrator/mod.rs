//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度：
//! - 管理应用生命周期（打开题库、导入、运行）
//! - 控制并发数量（Semaphore）
//! - 输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理全部 DEDUPE_PENDING 题目)
//!     ↓
//! workflow::DedupFlow (处理单道题目)
//!     ↓
//! services (能力层：similarity / lexical / arbiter / relation_graph ...)
//!     ↓
//! clients + store (向量服务、推理引擎、SQLite)
//! ```

pub mod batch_processor;

pub use batch_processor::{check_pending, App, BatchStats};
