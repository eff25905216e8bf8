#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use question_dedup::error::{ArbiterError, EmbeddingError};
use question_dedup::{
    DedupFlow, DedupSettings, Embedder, NewQuestion, Question, QuestionStatus, QuestionStore,
    ReasoningEngine,
};

/// 按文本查表的向量服务；未登记的文本得到正交的默认向量
#[derive(Default)]
pub struct TableEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl TableEmbedder {
    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }
}

#[async_trait]
impl Embedder for TableEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0, 0.0, 1.0]))
    }
}

/// 总是失败的向量服务
pub struct BrokenEmbedder;

#[async_trait]
impl Embedder for BrokenEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::request_failed("fake", "service unavailable"))
    }
}

/// 依次返回预设响应的推理引擎，并记录调用次数
pub struct ScriptedEngine {
    responses: Mutex<Vec<Result<String, ()>>>,
    pub calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new(responses: Vec<Result<&str, ()>>) -> Self {
        Self {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .rev()
                    .map(|r| r.map(str::to_string))
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
        }
    }

    /// 每次都返回同一个响应
    pub fn always(response: &str) -> Self {
        Self::new(vec![Ok(response); 64])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningEngine for ScriptedEngine {
    async fn complete(&self, _prompt: &str) -> Result<String, ArbiterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.responses.lock().unwrap().pop();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(())) | None => Err(ArbiterError::transport("fake", "connection reset")),
        }
    }
}

pub fn store() -> Arc<QuestionStore> {
    Arc::new(QuestionStore::open_in_memory().unwrap())
}

/// 插入一道已通过查重的题目（进入候选池）
pub fn seed_bank(store: &QuestionStore, text: &str) -> Question {
    let q = store.insert_question(&NewQuestion::new(text)).unwrap();
    store
        .commit_check(q.id, &[], QuestionStatus::DedupeApproved)
        .unwrap();
    store.get(q.id).unwrap().unwrap()
}

pub fn submit(store: &QuestionStore, text: &str) -> Question {
    store.insert_question(&NewQuestion::new(text)).unwrap()
}

pub fn flow(
    store: Arc<QuestionStore>,
    embedder: impl Embedder + 'static,
    engine: Arc<ScriptedEngine>,
) -> DedupFlow {
    DedupFlow::new(store, Arc::new(embedder), engine, DedupSettings::default())
}

pub fn status_of(store: &QuestionStore, id: i64) -> QuestionStatus {
    store.get(id).unwrap().unwrap().status
}
