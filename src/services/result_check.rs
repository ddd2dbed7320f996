//! 结果检查服务 - 业务能力层
//!
//! 有评分报告时读取并汇总；没有时退回到运行日志末尾

use crate::error::FileError;
use crate::models::loaders::{find_completion_artifacts, load_json};
use crate::models::report::GradingReport;
use crate::utils::read_log_tail;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// 检查结果
#[derive(Debug, Clone)]
pub enum CheckOutcome {
    /// 找到评分报告
    Report { path: PathBuf, report: GradingReport },
    /// 只有日志
    LogTail { path: PathBuf, lines: Vec<String> },
    /// 什么都没有
    Nothing,
}

impl CheckOutcome {
    /// 命令行退出码
    pub fn exit_code(&self) -> i32 {
        match self {
            CheckOutcome::Report { .. } | CheckOutcome::LogTail { .. } => 0,
            CheckOutcome::Nothing => 1,
        }
    }
}

/// 检查输出目录
///
/// 优先读取最新的评分报告；其次是运行日志，最后是日志目录中最新的文件
pub async fn check_results(
    output_dir: &Path,
    run_log_file: &Path,
    logs_dir: &Path,
    tail_lines: usize,
) -> Result<CheckOutcome, FileError> {
    if let Some(path) = find_completion_artifacts(output_dir)?.into_iter().next() {
        let report: GradingReport = load_json(&path).await?;
        return Ok(CheckOutcome::Report { path, report });
    }

    let mut candidates = vec![run_log_file.to_path_buf()];
    candidates.extend(newest_log(logs_dir));

    for path in candidates {
        let tail = read_log_tail(&path, tail_lines).map_err(|e| FileError::read(&path, e))?;
        if let Some(lines) = tail.filter(|lines| !lines.is_empty()) {
            return Ok(CheckOutcome::LogTail { path, lines });
        }
    }

    Ok(CheckOutcome::Nothing)
}

fn newest_log(logs_dir: &Path) -> Option<PathBuf> {
    std::fs::read_dir(logs_dir)
        .ok()?
        .filter_map(Result::ok)
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("log"))
        })
        .filter_map(|entry| {
            let modified: SystemTime = entry.metadata().and_then(|m| m.modified()).ok()?;
            Some((modified, entry.path()))
        })
        .max()
        .map(|(_, path)| path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::StudentInfo;

    fn sample_report() -> GradingReport {
        GradingReport {
            student_info: StudentInfo {
                name: Some("Jane Doe".to_string()),
                id: Some("S1".to_string()),
                email: None,
            },
            results: Vec::new(),
            total_marks_available: 10.0,
            total_marks_awarded: 8.0,
            percentage: 80.0,
            grade: "A-".to_string(),
            processing_time: 1.0,
            api_cost: 0.0,
            api_calls: 0,
            created_at: chrono::Local::now(),
        }
    }

    #[tokio::test]
    async fn test_report_is_preferred() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("output");
        crate::models::loaders::write_grading_report(&output, &sample_report())
            .await
            .unwrap();
        std::fs::write(dir.path().join("full_run.log"), "done\n").unwrap();

        let outcome = check_results(&output, &dir.path().join("full_run.log"), dir.path(), 5)
            .await
            .unwrap();
        match outcome {
            CheckOutcome::Report { report, .. } => assert_eq!(report.grade, "A-"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_falls_back_to_newest_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        std::fs::create_dir_all(&logs).unwrap();
        std::fs::write(logs.join("grading_20240101_000000.log"), "a\nb\nc\n").unwrap();

        let outcome = check_results(
            &dir.path().join("output"),
            &dir.path().join("full_run.log"),
            &logs,
            2,
        )
        .await
        .unwrap();
        match &outcome {
            CheckOutcome::LogTail { lines, .. } => assert_eq!(lines, &vec!["b", "c"]),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(outcome.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = check_results(
            &dir.path().join("output"),
            &dir.path().join("full_run.log"),
            &dir.path().join("logs"),
            5,
        )
        .await
        .unwrap();
        assert!(matches!(outcome, CheckOutcome::Nothing));
        assert_eq!(outcome.exit_code(), 1);
    }
}
