/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化全局日志
///
/// 优先使用 `RUST_LOG`；未设置时 verbose 为 debug，否则为 info。
/// 重复调用是安全的（第二次调用无效果）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `database_path`: 题库路径
/// - `max_concurrent`: 最大并发数
pub fn log_startup(database_path: &str, max_concurrent: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 题库查重模式");
    info!("🗄️ 题库: {}", database_path);
    info!("📊 最大并发数: {}", max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `total`: 待查重题目数
/// - `max_concurrent`: 最大并发数
pub fn log_batch_start(total: usize, max_concurrent: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 找到 {} 道待查重题目", total);
    info!("📋 最多同时查重 {} 道", max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 记录单题完成信息
pub fn log_question_complete(question_id: i64, match_count: usize) {
    if match_count == 0 {
        info!("[题目 #{}] ✓ 查重完成，无重复", question_id);
    } else {
        info!("[题目 #{}] ⚠️ 查重完成，发现 {} 条匹配", question_id, match_count);
    }
}

/// 打印最终统计信息
///
/// # 参数
/// - `flagged`: 标记为疑似重复的数量
/// - `approved`: 通过查重的数量
/// - `failed`: 失败数量
/// - `total`: 总数
pub fn print_final_stats(flagged: usize, approved: usize, failed: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 查重完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 通过: {}/{}", approved, total);
    info!("⚠️ 疑似重复: {}", flagged);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate_text("数据库系统概论", 3), "数据库...");
        assert_eq!(truncate_text("short", 10), "short");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(false);
        init(true);
    }
}
