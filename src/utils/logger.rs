//! 日志初始化
//!
//! 控制台输出始终开启；`init_with_file` 额外把同样的事件写入 `logs/` 下的带时间戳文件

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// 仅输出到控制台
pub fn init(default_level: &str) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}

/// 输出到控制台并写入日志文件，返回日志文件路径
pub fn init_with_file(default_level: &str, logs_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("无法创建日志目录: {}", logs_dir.display()))?;

    let log_file = logs_dir.join(format!(
        "grading_{}.log",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ));
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .with_context(|| format!("无法打开日志文件: {}", log_file.display()))?;
    file.write_all(crate::utils::logging::log_header().as_bytes())?;

    let _ = tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init();

    tracing::info!("日志文件: {}", log_file.display());
    Ok(log_file)
}
