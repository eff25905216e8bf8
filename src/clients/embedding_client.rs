//! 向量服务客户端（OpenAI 兼容 embeddings 接口）
//!
//! 底层 HTTP 客户端在第一次调用时初始化，`OnceCell` 保证并发的
//! 首次调用者只会初始化一次。`OpenAiEmbedder::shared` 提供进程级单例。

use std::sync::{Arc, OnceLock};

use async_openai::{
    config::OpenAIConfig, types::embeddings::CreateEmbeddingRequestArgs, Client,
};
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::clients::Embedder;
use crate::config::Config;
use crate::error::EmbeddingError;

static SHARED: OnceLock<Arc<OpenAiEmbedder>> = OnceLock::new();

/// OpenAI 兼容的向量客户端
pub struct OpenAiEmbedder {
    api_key: String,
    api_base_url: String,
    model_name: String,
    client: OnceCell<Client<OpenAIConfig>>,
}

impl OpenAiEmbedder {
    pub fn new(config: &Config) -> Self {
        Self {
            api_key: config.embedding_api_key.clone(),
            api_base_url: config.embedding_api_base_url.clone(),
            model_name: config.embedding_model_name.clone(),
            client: OnceCell::new(),
        }
    }

    /// 进程级共享实例（首次调用时用给定配置创建，之后忽略配置）
    pub fn shared(config: &Config) -> Arc<OpenAiEmbedder> {
        SHARED
            .get_or_init(|| Arc::new(OpenAiEmbedder::new(config)))
            .clone()
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn is_initialized(&self) -> bool {
        self.client.initialized()
    }

    async fn client(&self) -> Result<&Client<OpenAIConfig>, EmbeddingError> {
        self.client
            .get_or_try_init(|| async {
                if self.api_base_url.trim().is_empty() {
                    return Err(EmbeddingError::InitFailed("未配置向量服务地址".to_string()));
                }
                info!("🧠 初始化向量模型: {}", self.model_name);
                let openai_config = OpenAIConfig::new()
                    .with_api_key(&self.api_key)
                    .with_api_base(&self.api_base_url);
                Ok(Client::with_config(openai_config))
            })
            .await
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or(EmbeddingError::CountMismatch {
            expected: 1,
            actual: 0,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let client = self.client().await?;
        debug!("调用向量接口，模型: {}，文本数: {}", self.model_name, texts.len());

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model_name)
            .input(texts.to_vec())
            .build()
            .map_err(|e| EmbeddingError::request_failed(&self.model_name, e))?;

        let response = client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| EmbeddingError::request_failed(&self.model_name, e))?;

        if response.data.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: response.data.len(),
            });
        }

        // 接口不保证返回顺序，按 index 还原
        let mut data = response.data;
        data.sort_by_key(|item| item.index);
        Ok(data.into_iter().map(|item| item.embedding).collect())
    }
}
