//! 日志工具模块
//!
//! 提供日志格式化和输出的辅助函数

use std::ops::RangeInclusive;
use std::path::Path;
use tracing::{info, warn};

/// 日志文件头
pub fn log_header() -> String {
    format!(
        "{}\n评分流水线日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    )
}

/// 输出阶段标题
pub fn log_banner(title: &str) {
    info!("{}", "=".repeat(60));
    info!("{}", title);
    info!("{}", "=".repeat(60));
}

/// 批次开始：`sheets` 为本批答卷编号（从 1 开始）
pub fn log_batch_start(
    batch_num: usize,
    total_batches: usize,
    sheets: RangeInclusive<usize>,
    total: usize,
) {
    info!("{}", "=".repeat(60));
    info!(
        "📦 第 {}/{} 批 | 答卷 {}-{}（共 {} 份）",
        batch_num,
        total_batches,
        sheets.start(),
        sheets.end(),
        total
    );
    info!("{}", "=".repeat(60));
}

pub fn log_batch_complete(batch_num: usize, graded: usize, failed: usize) {
    if failed == 0 {
        info!("✓ 第 {} 批评分完成: {} 份", batch_num, graded);
    } else {
        warn!("第 {} 批评分完成: {} 份成功, {} 份失败", batch_num, graded, failed);
    }
}

/// 批量评分结束后的汇总
pub fn print_final_stats(graded: usize, failed: usize, total: usize, output_dir: &Path) {
    log_banner(&format!(
        "📊 评分结束 {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    info!("已评分: {}/{} 份答卷", graded, total);
    if failed > 0 {
        warn!("未完成: {} 份（见上方错误日志）", failed);
    }
    info!("评分报告目录: {}", output_dir.display());
}

/// 按字符数截断，超出部分用 `...` 表示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

/// 读取日志文件末尾的若干非空行
///
/// 文件不存在时返回 `Ok(None)`
pub fn read_log_tail(path: &Path, lines: usize) -> std::io::Result<Option<Vec<String>>> {
    let content = match std::fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut tail: Vec<String> = content
        .lines()
        .rev()
        .filter(|line| !line.trim().is_empty())
        .take(lines)
        .map(str::to_string)
        .collect();
    tail.reverse();
    Ok(Some(tail))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_counts_chars() {
        assert_eq!(truncate_text("评分流水线", 2), "评分...");
        assert_eq!(truncate_text("short", 10), "short");
    }

    #[test]
    fn test_read_log_tail_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("full_run.log");
        std::fs::write(&path, "one\ntwo\n\nthree\n\n").unwrap();

        let tail = read_log_tail(&path, 2).unwrap().unwrap();
        assert_eq!(tail, vec!["two", "three"]);
    }

    #[test]
    fn test_read_log_tail_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_log_tail(&dir.path().join("none.log"), 5).unwrap().is_none());
    }
}
