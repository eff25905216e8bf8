use crate::models::question::NewQuestion;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

/// 提交文件格式
///
/// ```toml
/// [[questions]]
/// text = "Explain DBMS architecture."
/// subject = "DBMS"
/// bloom_level = "RBT2"
/// ```
#[derive(Debug, Deserialize)]
struct SubmissionFile {
    #[serde(default)]
    questions: Vec<NewQuestion>,
}

/// 从 TOML 文件加载待提交的题目
///
/// 空题干会被跳过并记录警告
pub async fn load_submission_file(path: &Path) -> Result<Vec<NewQuestion>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取提交文件: {}", path.display()))?;

    let file: SubmissionFile = toml::from_str(&content)
        .with_context(|| format!("无法解析提交文件: {}", path.display()))?;

    let total = file.questions.len();
    let questions: Vec<NewQuestion> = file
        .questions
        .into_iter()
        .filter(|q| !q.text.trim().is_empty())
        .collect();

    if questions.len() < total {
        tracing::warn!(
            "提交文件 {} 中有 {} 道空题干被跳过",
            path.display(),
            total - questions.len()
        );
    }

    tracing::info!("从 {} 加载了 {} 道题目", path.display(), questions.len());
    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_load_submission_file_skips_blank_text() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[[questions]]
text = "Define DBMS."
subject = "DBMS"

[[questions]]
text = "   "

[[questions]]
text = "Compare TCP and UDP."
bloom_level = "RBT4"
"#
        )
        .unwrap();

        let questions = load_submission_file(file.path()).await.unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].subject.as_deref(), Some("DBMS"));
        assert_eq!(questions[1].bloom_level.as_deref(), Some("RBT4"));
    }

    #[tokio::test]
    async fn test_load_submission_file_missing_file() {
        let result = load_submission_file(Path::new("/nonexistent/submission.toml")).await;
        assert!(result.is_err());
    }
}
