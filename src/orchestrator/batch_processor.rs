//! 批量查重处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量查重和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：打开题库、创建共享的 `DedupFlow`
//! 2. **导入**：可选地从 TOML 提交文件导入新题目
//! 3. **并发控制**：使用 Semaphore 限制同时查重的题目数量
//! 4. **全局统计**：汇总所有题目的查重结果
//!
//! 单题失败只计入统计，不影响其他题目。

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::{load_submission_file, QuestionStatus};
use crate::store::QuestionStore;
use crate::utils::logging;
use crate::workflow::DedupFlow;

/// 应用主结构
pub struct App {
    config: Config,
    store: Arc<QuestionStore>,
    flow: Arc<DedupFlow>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config.database_path, config.max_concurrent_checks);

        let store = Arc::new(
            QuestionStore::open(Path::new(&config.database_path))
                .with_context(|| format!("无法打开题库: {}", config.database_path))?,
        );
        let flow = Arc::new(DedupFlow::from_config(store.clone(), &config));

        Ok(Self {
            config,
            store,
            flow,
        })
    }

    /// 用已有的流程创建应用（测试或自定义协作方时使用）
    pub fn with_flow(config: Config, flow: Arc<DedupFlow>) -> Self {
        let store = flow.store().clone();
        Self {
            config,
            store,
            flow,
        }
    }

    /// 运行应用主逻辑：导入（可选）→ 批量查重 → 统计
    pub async fn run(&self, submission: Option<&Path>) -> Result<BatchStats> {
        if let Some(path) = submission {
            self.import(path).await?;
        }

        let stats = check_pending(self.flow.clone(), self.config.max_concurrent_checks).await?;
        logging::print_final_stats(stats.flagged, stats.approved, stats.failed, stats.total);
        Ok(stats)
    }

    /// 从提交文件导入新题目，返回导入数量
    pub async fn import(&self, path: &Path) -> Result<usize> {
        info!("\n📁 正在导入提交文件: {}", path.display());
        let questions = load_submission_file(path).await?;

        for new in &questions {
            let q = self.store.insert_question(new)?;
            info!(
                "[题目 #{}] ✓ 已导入: {}",
                q.id,
                logging::truncate_text(&q.text, 50)
            );
        }

        info!("✓ 共导入 {} 道题目", questions.len());
        Ok(questions.len())
    }
}

/// 批量查重统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchStats {
    pub total: usize,
    pub flagged: usize,
    pub approved: usize,
    pub failed: usize,
}

/// 对所有 DEDUPE_PENDING 题目并发查重
///
/// 同一时刻最多 `max_concurrent` 道题在查重中
pub async fn check_pending(flow: Arc<DedupFlow>, max_concurrent: usize) -> Result<BatchStats> {
    let pending = flow.store().list_with_status(QuestionStatus::DedupePending)?;

    let mut stats = BatchStats {
        total: pending.len(),
        ..Default::default()
    };
    if pending.is_empty() {
        warn!("⚠️ 没有待查重的题目");
        return Ok(stats);
    }

    let max_concurrent = max_concurrent.max(1);
    logging::log_batch_start(pending.len(), max_concurrent);

    let semaphore = Arc::new(Semaphore::new(max_concurrent));
    let mut handles = Vec::with_capacity(pending.len());

    for question in pending {
        let permit = semaphore.clone().acquire_owned().await?;
        let flow = flow.clone();
        let question_id = question.id;

        let handle = tokio::spawn(async move {
            let _permit = permit;
            flow.check_question(&question).await
        });
        handles.push((question_id, handle));
    }

    let (ids, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
    let results = join_all(handles).await;

    for (question_id, result) in ids.into_iter().zip(results) {
        match result {
            Ok(Ok(records)) => {
                logging::log_question_complete(question_id, records.len());
                if records.is_empty() {
                    stats.approved += 1;
                } else {
                    stats.flagged += 1;
                }
            }
            Ok(Err(e)) => {
                error!("[题目 #{}] ❌ 查重失败: {}", question_id, e);
                stats.failed += 1;
            }
            Err(e) => {
                error!("[题目 #{}] 任务执行失败: {}", question_id, e);
                stats.failed += 1;
            }
        }
    }

    Ok(stats)
}
