//! 完成监控服务 - 业务能力层
//!
//! 定期检查输出目录中是否出现评分报告，期间打印运行日志末尾几行

use crate::config::Config;
use crate::error::FileError;
use crate::models::loaders::find_completion_artifacts;
use crate::utils::read_log_tail;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// 监控结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// 找到完成标志文件
    Completed(PathBuf),
    /// 达到最大检查次数
    TimedOut { checks: u32 },
}

/// 完成监控
///
/// 检查在前、等待在后：第一次检查不等待，最后一次检查后不再等待，
/// 总耗时不超过 `max_checks * interval`
#[derive(Debug, Clone)]
pub struct Monitor {
    output_dir: PathBuf,
    run_log_file: PathBuf,
    interval: Duration,
    max_checks: u32,
    tail_lines: usize,
}

impl Monitor {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        run_log_file: impl Into<PathBuf>,
        interval: Duration,
        max_checks: u32,
        tail_lines: usize,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            run_log_file: run_log_file.into(),
            interval,
            max_checks,
            tail_lines,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.output_dir,
            &config.run_log_file,
            config.poll_interval(),
            config.max_checks,
            config.log_tail_lines,
        )
    }

    /// 开始轮询
    pub async fn run(&self) -> Result<MonitorOutcome, FileError> {
        info!(
            "👀 开始监控 {}，每 {:?} 检查一次，最多 {} 次",
            self.output_dir.display(),
            self.interval,
            self.max_checks
        );

        for attempt in 1..=self.max_checks {
            if let Some(artifact) = find_completion_artifacts(&self.output_dir)?.into_iter().next() {
                info!("✅ 评分完成: {}", artifact.display());
                return Ok(MonitorOutcome::Completed(artifact));
            }

            info!("[{}/{}] ⏳ 尚未完成", attempt, self.max_checks);
            self.log_progress();

            if attempt < self.max_checks {
                tokio::time::sleep(self.interval).await;
            }
        }

        warn!("⚠️ 已检查 {} 次仍未完成", self.max_checks);
        Ok(MonitorOutcome::TimedOut {
            checks: self.max_checks,
        })
    }

    fn log_progress(&self) {
        match read_log_tail(&self.run_log_file, self.tail_lines) {
            Ok(Some(lines)) if !lines.is_empty() => {
                for line in lines {
                    info!("   │ {}", line);
                }
            }
            Ok(_) => info!("   日志尚未生成: {}", self.run_log_file.display()),
            Err(e) => warn!("读取日志失败 ({}): {}", self.run_log_file.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_completes_immediately_when_artifact_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("grading_report_S1.json"), "{}").unwrap();

        let monitor = Monitor::new(
            dir.path(),
            dir.path().join("full_run.log"),
            Duration::from_secs(30),
            3,
            5,
        );
        let started = Instant::now();
        let outcome = monitor.run().await.unwrap();

        assert!(matches!(outcome, MonitorOutcome::Completed(_)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_times_out_after_max_checks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("full_run.log"), "step 1\nstep 2\n").unwrap();

        let monitor = Monitor::new(
            dir.path(),
            dir.path().join("full_run.log"),
            Duration::from_millis(20),
            3,
            5,
        );
        let started = Instant::now();
        let outcome = monitor.run().await.unwrap();

        assert_eq!(outcome, MonitorOutcome::TimedOut { checks: 3 });
        // 只在两次检查之间等待
        assert!(started.elapsed() >= Duration::from_millis(40));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_zero_checks_times_out_without_looking() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = Monitor::new(dir.path(), "none.log", Duration::from_secs(30), 0, 5);
        assert_eq!(
            monitor.run().await.unwrap(),
            MonitorOutcome::TimedOut { checks: 0 }
        );
    }
}
