//! 第二层：词面 + 数字消歧
//!
//! 向量相似度高并不代表是同一道题：
//! - 措辞差异大（TF-IDF 相似度低）可能是上下位关系
//! - 数字不同（"2 + 2" 与 "2 + 3"）一定不是同一道题
//!
//! 这两种情况判为"歧义"，交给第三层仲裁。

use std::collections::{BTreeSet, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::DedupSettings;

static STRIP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s%]").expect("valid strip regex"));
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid number regex"));
/// 与常见 TF-IDF 实现一致：至少两个字符的词
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("valid token regex"));

/// 第二层判断结果
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalReport {
    pub lexical_similarity: f32,
    pub numbers_match: bool,
    pub ambiguous: bool,
}

/// 词面消歧器
#[derive(Debug, Clone)]
pub struct LexicalDisambiguator {
    vector_threshold: f32,
    lexical_threshold: f32,
}

impl LexicalDisambiguator {
    pub fn new(settings: &DedupSettings) -> Self {
        Self {
            vector_threshold: settings.ambiguity_vector_threshold,
            lexical_threshold: settings.lexical_threshold,
        }
    }

    /// 判断一对题目是否"歧义"
    ///
    /// `(vector_sim > 向量阈值 且 lexical_sim < 词面阈值) 或 数字集合不同`
    pub fn assess(&self, text_a: &str, text_b: &str, vector_sim: f32) -> LexicalReport {
        let norm_a = normalize(text_a);
        let norm_b = normalize(text_b);

        let lexical_similarity = pair_tfidf_cosine(&norm_a, &norm_b);
        let numbers_match = numeric_tokens(&norm_a) == numeric_tokens(&norm_b);

        let ambiguous = (vector_sim > self.vector_threshold
            && lexical_similarity < self.lexical_threshold)
            || !numbers_match;

        LexicalReport {
            lexical_similarity,
            numbers_match,
            ambiguous,
        }
    }
}

/// 小写，去掉除字母数字、空白、`%` 以外的字符
pub fn normalize(text: &str) -> String {
    STRIP_RE
        .replace_all(&text.to_lowercase(), "")
        .trim()
        .to_string()
}

/// 文本中所有连续数字串的集合
pub fn numeric_tokens(text: &str) -> BTreeSet<String> {
    NUMBER_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn term_counts(text: &str) -> HashMap<String, f32> {
    let mut counts = HashMap::new();
    for token in TOKEN_RE.find_iter(text) {
        *counts.entry(token.as_str().to_string()).or_insert(0.0) += 1.0;
    }
    counts
}

/// 只用这两段文本构建 TF-IDF（平滑 idf，L2 归一化）后求余弦
///
/// 两段文本都没有可用词时返回 0.0
pub fn pair_tfidf_cosine(a: &str, b: &str) -> f32 {
    let counts_a = term_counts(a);
    let counts_b = term_counts(b);

    // idf = ln((1 + n) / (1 + df)) + 1, n = 2
    let idf = |term: &str| -> f32 {
        let df = counts_a.contains_key(term) as u8 + counts_b.contains_key(term) as u8;
        (3.0_f32 / (1.0 + f32::from(df))).ln() + 1.0
    };

    let weigh = |counts: &HashMap<String, f32>| -> HashMap<String, f32> {
        counts
            .iter()
            .map(|(term, tf)| (term.clone(), tf * idf(term)))
            .collect()
    };

    let weights_a = weigh(&counts_a);
    let weights_b = weigh(&counts_b);

    let norm = |w: &HashMap<String, f32>| w.values().map(|x| x * x).sum::<f32>().sqrt();
    let (norm_a, norm_b) = (norm(&weights_a), norm(&weights_b));
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }

    let dot: f32 = weights_a
        .iter()
        .filter_map(|(term, wa)| weights_b.get(term).map(|wb| wa * wb))
        .sum();

    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}
