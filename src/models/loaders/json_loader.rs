use crate::error::FileError;
use crate::models::question::{AnswerSheet, OcrPage, QuestionPaper, SolutionPaper};
use crate::models::report::{GradingReport, ProcessingMetrics};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

/// 完成标志文件名前缀
pub const COMPLETION_PREFIX: &str = "grading_report_";

/// 从 JSON 文件加载数据
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, FileError> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| FileError::read(path, e))?;

    let value = serde_json::from_str(&content).map_err(|source| FileError::JsonParseFailed {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!("已加载 JSON: {}", path.display());
    Ok(value)
}

/// 将数据保存为格式化 JSON，自动创建父目录
pub async fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), FileError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| FileError::write(parent, e))?;
    }

    let content = serde_json::to_string_pretty(value).map_err(|source| {
        FileError::JsonParseFailed {
            path: path.to_path_buf(),
            source,
        }
    })?;

    fs::write(path, content)
        .await
        .map_err(|e| FileError::write(path, e))?;
    Ok(())
}

/// 保存试题卷
pub async fn write_question_paper(
    output_dir: &Path,
    paper: &QuestionPaper,
) -> Result<PathBuf, FileError> {
    let path = output_dir.join("question_paper.json");
    save_json(&path, paper).await?;
    tracing::info!("✓ 试题卷 JSON 已保存: {} ({} 道题)", path.display(), paper.total_questions);
    Ok(path)
}

/// 保存答案卷
pub async fn write_solution_paper(
    output_dir: &Path,
    paper: &SolutionPaper,
) -> Result<PathBuf, FileError> {
    let path = output_dir.join("solution_paper.json");
    save_json(&path, paper).await?;
    tracing::info!("✓ 答案卷 JSON 已保存: {} ({} 道题)", path.display(), paper.total_questions);
    Ok(path)
}

/// 保存学生答卷，文件名按学号区分
pub async fn write_answer_sheet(
    output_dir: &Path,
    student_id: &str,
    sheet: &AnswerSheet,
) -> Result<PathBuf, FileError> {
    let path = output_dir.join(format!("answer_sheet_{}.json", sanitize_id(student_id)));
    save_json(&path, sheet).await?;
    tracing::info!("✓ 学生答卷 JSON 已保存: {}", path.display());
    Ok(path)
}

/// 保存评分报告（即完成标志文件）
pub async fn write_grading_report(
    output_dir: &Path,
    report: &GradingReport,
) -> Result<PathBuf, FileError> {
    let student_id = sanitize_id(report.student_info.display_id());
    let path = output_dir.join(format!("{}{}.json", COMPLETION_PREFIX, student_id));
    save_json(&path, report).await?;
    tracing::info!("✓ 评分报告已保存: {}", path.display());
    Ok(path)
}

/// 保存处理指标
pub async fn write_processing_metrics(
    output_dir: &Path,
    metrics: &ProcessingMetrics,
) -> Result<PathBuf, FileError> {
    let path = output_dir.join("processing_metrics.json");
    save_json(&path, metrics).await?;
    Ok(path)
}

/// 加载 OCR 转写结果
///
/// `.json` 文件按页数组解析，其余文件整体视为一页纯文本
pub async fn load_transcript(path: &Path) -> Result<Vec<OcrPage>, FileError> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        return load_json(path).await;
    }

    let text = fs::read_to_string(path)
        .await
        .map_err(|e| FileError::read(path, e))?;
    Ok(vec![OcrPage::from_text(text)])
}

/// 依次加载多个转写文件，页序与参数顺序一致
pub async fn load_transcripts(paths: &[PathBuf]) -> Result<Vec<OcrPage>, FileError> {
    let mut pages = Vec::new();
    for path in paths {
        let loaded = load_transcript(path).await?;
        tracing::info!("正在加载: {} ({} 页)", path.display(), loaded.len());
        pages.extend(loaded);
    }
    Ok(pages)
}

/// 查找输出目录中所有完成标志文件，最新的排在最前
///
/// 目录不存在时返回空列表
pub fn find_completion_artifacts(output_dir: &Path) -> Result<Vec<PathBuf>, FileError> {
    let entries = match std::fs::read_dir(output_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(FileError::read(output_dir, e)),
    };

    let mut artifacts: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| FileError::read(output_dir, e))?;
        let path = entry.path();
        if !is_completion_artifact(&path) {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        artifacts.push((modified, path));
    }

    artifacts.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    Ok(artifacts.into_iter().map(|(_, path)| path).collect())
}

fn is_completion_artifact(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(COMPLETION_PREFIX) && name.ends_with(".json"))
}

/// 学号中的路径分隔符等字符替换为下划线
fn sanitize_id(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}
