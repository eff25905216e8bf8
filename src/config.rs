use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;

/// 查重阈值配置
///
/// 显式传给 `DedupFlow`，不使用模块级常量
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DedupSettings {
    /// 进入第二层判断的向量相似度下限（含）
    pub similarity_threshold: f32,
    /// 第二层：向量相似度高于此值且词面相似度低时视为"歧义"
    pub ambiguity_vector_threshold: f32,
    /// 第二层：词面（TF-IDF）相似度下限
    pub lexical_threshold: f32,
    /// 推理引擎单次调用超时（秒）
    pub arbiter_timeout_secs: u64,
    /// 推理引擎温度
    pub arbiter_temperature: f32,
}

impl Default for DedupSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            ambiguity_vector_threshold: 0.85,
            lexical_threshold: 0.70,
            arbiter_timeout_secs: 30,
            arbiter_temperature: 0.0,
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite 数据库路径
    pub database_path: String,
    /// 同时查重的题目数量
    pub max_concurrent_checks: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- 推理引擎配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    // --- 向量服务配置 ---
    pub embedding_api_key: String,
    pub embedding_api_base_url: String,
    pub embedding_model_name: String,
    // --- 查重阈值 ---
    pub dedup: DedupSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "question_bank.db".to_string(),
            max_concurrent_checks: 8,
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.groq.com/openai/v1".to_string(),
            llm_model_name: "llama-3.3-70b-versatile".to_string(),
            embedding_api_key: String::new(),
            embedding_api_base_url: "https://api.openai.com/v1".to_string(),
            embedding_model_name: "text-embedding-3-small".to_string(),
            dedup: DedupSettings::default(),
        }
    }
}

impl Config {
    /// 从环境变量加载（未设置的字段使用默认值）
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载，再用环境变量覆盖
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::ParseFailed {
            path: path.display().to_string(),
            source,
        })?;
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(self) -> Self {
        let base = self;
        let dedup = DedupSettings {
            similarity_threshold: env_parse("DEDUP_SIMILARITY_THRESHOLD").unwrap_or(base.dedup.similarity_threshold),
            ambiguity_vector_threshold: env_parse("DEDUP_AMBIGUITY_VECTOR_THRESHOLD").unwrap_or(base.dedup.ambiguity_vector_threshold),
            lexical_threshold: env_parse("DEDUP_LEXICAL_THRESHOLD").unwrap_or(base.dedup.lexical_threshold),
            arbiter_timeout_secs: env_parse("ARBITER_TIMEOUT_SECS").unwrap_or(base.dedup.arbiter_timeout_secs),
            arbiter_temperature: env_parse("ARBITER_TEMPERATURE").unwrap_or(base.dedup.arbiter_temperature),
        };
        Self {
            database_path: std::env::var("DATABASE_PATH").unwrap_or(base.database_path),
            max_concurrent_checks: env_parse("MAX_CONCURRENT_CHECKS").unwrap_or(base.max_concurrent_checks),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(base.verbose_logging),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(base.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(base.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(base.llm_model_name),
            embedding_api_key: std::env::var("EMBEDDING_API_KEY").unwrap_or(base.embedding_api_key),
            embedding_api_base_url: std::env::var("EMBEDDING_API_BASE_URL").unwrap_or(base.embedding_api_base_url),
            embedding_model_name: std::env::var("EMBEDDING_MODEL_NAME").unwrap_or(base.embedding_model_name),
            dedup,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_thresholds() {
        let config = Config::default();
        assert_eq!(config.dedup.similarity_threshold, 0.85);
        assert_eq!(config.dedup.lexical_threshold, 0.70);
        assert!(config.dedup.arbiter_timeout_secs > 0);
    }

    #[test]
    fn test_load_partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
database_path = "custom.db"

[dedup]
similarity_threshold = 0.9
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.database_path, "custom.db");
        assert_eq!(config.dedup.similarity_threshold, 0.9);
        assert_eq!(config.dedup.lexical_threshold, 0.70);
        assert_eq!(config.llm_model_name, "llama-3.3-70b-versatile");
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database_path = [").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does_not_exist.toml");
        assert!(matches!(
            Config::load(&missing),
            Err(ConfigError::ReadFailed { .. })
        ));
    }
}
