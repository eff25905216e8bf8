use std::path::PathBuf;

use anyhow::Result;
use question_dedup::utils::logging;
use question_dedup::{App, Config};

/// 用法: question_dedup [config.toml] [submission.toml]
#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from);
    let submission_path = args.next().map(PathBuf::from);

    // 加载配置：指定了路径就必须能读到
    let config = match config_path.as_deref() {
        Some(path) => Config::load(path)?,
        None => Config::from_env(),
    };

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    let app = App::initialize(config).await?;
    app.run(submission_path.as_deref()).await?;

    Ok(())
}
