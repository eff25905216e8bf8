//! 外部协作方客户端
//!
//! - `Embedder`：文本 → 向量
//! - `ReasoningEngine`：提示词 → 文本
//!
//! 两者均无状态、只读，初始化后可在并发查重之间共享。

pub mod embedding_client;
pub mod llm_client;

use async_trait::async_trait;

use crate::error::{ArbiterError, EmbeddingError};

pub use embedding_client::OpenAiEmbedder;
pub use llm_client::LlmClient;

/// 向量服务
#[async_trait]
pub trait Embedder: Send + Sync {
    /// 单条文本向量化
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// 批量向量化，返回顺序与输入一致
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// 推理引擎
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ArbiterError>;
}
