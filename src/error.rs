use thiserror::Error;

use crate::models::{QuestionId, QuestionStatus, Verdict};

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 存储层错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 向量服务错误
    #[error("向量服务错误: {0}")]
    Embedding(#[from] EmbeddingError),
    /// 推理引擎错误（通常被降级为 ERROR 结论，不会走到这里）
    #[error("仲裁错误: {0}")]
    Arbiter(#[from] ArbiterError),
    /// 关系图错误
    #[error("关系错误: {0}")]
    Relation(#[from] RelationError),
    /// 状态流转错误
    #[error("状态错误: {0}")]
    Lifecycle(#[from] LifecycleError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 存储层错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite 执行失败
    #[error("SQLite 执行失败: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// 行数据无法解码
    #[error("无法解码字段 {column}: {value}")]
    Decode { column: &'static str, value: String },
}

/// 向量服务错误
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// 请求失败
    #[error("向量请求失败 (模型: {model}): {message}")]
    RequestFailed { model: String, message: String },
    /// 返回数量与输入不一致
    #[error("向量数量不匹配: 期望 {expected}, 实际 {actual}")]
    CountMismatch { expected: usize, actual: usize },
    /// 初始化失败
    #[error("向量模型初始化失败: {0}")]
    InitFailed(String),
}

/// 推理引擎（仲裁）错误
///
/// 非致命：只影响当前这一对题目，结论记为 ERROR
#[derive(Debug, Error)]
pub enum ArbiterError {
    /// 网络或 API 调用失败
    #[error("推理引擎调用失败 (模型: {model}): {message}")]
    Transport { model: String, message: String },
    /// 超时
    #[error("推理引擎超时 ({secs} 秒)")]
    Timeout { secs: u64 },
    /// 返回内容为空
    #[error("推理引擎返回内容为空")]
    EmptyResponse,
    /// 响应中没有完整的 JSON 对象
    #[error("响应中未找到 JSON 对象: {response}")]
    NoJsonObject { response: String },
    /// JSON 不符合约定结构
    #[error("响应结构无效: {0}")]
    Schema(String),
}

/// 关系图错误
#[derive(Debug, Error)]
pub enum RelationError {
    /// 题目不存在
    #[error("题目不存在: #{0}")]
    NotFound(QuestionId),
    /// 建立父子关系会形成环
    #[error("题目 #{question_id} 不能成为 #{target_id} 的子题: 会形成环")]
    Cycle {
        question_id: QuestionId,
        target_id: QuestionId,
    },
    /// 题目与自己建立平行关系
    #[error("题目 #{0} 不能与自身建立平行关系")]
    SelfLink(QuestionId),
    /// 匹配结论不是关系类结论
    #[error("结论 {0} 不对应任何关系")]
    NotARelation(Verdict),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 状态流转错误
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// 题目不存在
    #[error("题目不存在: {0:?}")]
    NotFound(Vec<QuestionId>),
    /// 非法状态迁移
    #[error("题目 #{id} 不能从 {from} 迁移到 {to}")]
    InvalidTransition {
        id: QuestionId,
        from: QuestionStatus,
        to: QuestionStatus,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Store(StoreError::Sqlite(err))
    }
}

impl From<rusqlite::Error> for RelationError {
    fn from(err: rusqlite::Error) -> Self {
        RelationError::Store(StoreError::Sqlite(err))
    }
}

impl From<rusqlite::Error> for LifecycleError {
    fn from(err: rusqlite::Error) -> Self {
        LifecycleError::Store(StoreError::Sqlite(err))
    }
}

// ========== 便捷构造函数 ==========

impl ArbiterError {
    /// 创建调用失败错误
    pub fn transport(model: impl Into<String>, source: impl std::fmt::Display) -> Self {
        ArbiterError::Transport {
            model: model.into(),
            message: source.to_string(),
        }
    }
}

impl EmbeddingError {
    /// 创建请求失败错误
    pub fn request_failed(model: impl Into<String>, source: impl std::fmt::Display) -> Self {
        EmbeddingError::RequestFailed {
            model: model.into(),
            message: source.to_string(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
