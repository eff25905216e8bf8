//! 第一层：向量相似度
//!
//! 只负责"打分"能力：目标文本对候选池逐条给出 [0, 1] 的余弦相似度，无副作用

use std::sync::Arc;

use tracing::debug;

use crate::clients::Embedder;
use crate::error::EmbeddingError;

/// 向量相似度打分
pub struct SimilarityScorer {
    embedder: Arc<dyn Embedder>,
}

impl SimilarityScorer {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// 计算目标文本与每个候选文本的相似度，顺序与 `candidates` 一致
    ///
    /// 候选池为空时直接返回空结果，不调用向量服务
    pub async fn score(
        &self,
        target: &str,
        candidates: &[String],
    ) -> Result<Vec<f32>, EmbeddingError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        debug!("向量化目标题目与 {} 个候选", candidates.len());
        let target_vec = self.embedder.embed(target).await?;
        let candidate_vecs = self.embedder.embed_batch(candidates).await?;

        if candidate_vecs.len() != candidates.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: candidates.len(),
                actual: candidate_vecs.len(),
            });
        }

        Ok(candidate_vecs
            .iter()
            .map(|v| cosine_similarity(&target_vec, v).clamp(0.0, 1.0))
            .collect())
    }
}

/// 余弦相似度；长度不一致或含零向量时返回 0.0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a > f32::EPSILON && norm_b > f32::EPSILON {
        dot / (norm_a * norm_b)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 按首字母给出固定向量
    struct LetterEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for LetterEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(match text.chars().next() {
                Some('a') => vec![1.0, 0.0],
                Some('b') => vec![0.0, 1.0],
                Some('c') => vec![-1.0, 0.0],
                _ => vec![1.0, 1.0],
            })
        }
    }

    #[test]
    fn test_cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_score_preserves_order_and_clamps() {
        let embedder = Arc::new(LetterEmbedder {
            calls: AtomicUsize::new(0),
        });
        let scorer = SimilarityScorer::new(embedder);
        let scores = scorer
            .score(
                "apple",
                &["avocado".to_string(), "banana".to_string(), "cherry".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(scores.len(), 3);
        assert!((scores[0] - 1.0).abs() < 1e-6);
        assert!(scores[1].abs() < 1e-6);
        // 反向向量被截断到 0
        assert_eq!(scores[2], 0.0);
    }

    #[tokio::test]
    async fn test_empty_pool_skips_embedding() {
        let embedder = Arc::new(LetterEmbedder {
            calls: AtomicUsize::new(0),
        });
        let scorer = SimilarityScorer::new(embedder.clone());
        assert!(scorer.score("apple", &[]).await.unwrap().is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }
}
