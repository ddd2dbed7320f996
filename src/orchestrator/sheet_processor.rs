//! 单份答卷处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **加载答卷**：读取 answer_sheet_<学号>.json
//! 2. **构建上下文**：`SheetCtx`
//! 3. **流程调度**：委托 `GradingFlow` 评分并写出报告
//! 4. **统计输出**：记录本份答卷的得分

use crate::models::loaders::load_json;
use crate::models::question::{AnswerSheet, QuestionPaper, SolutionPaper};
use crate::workflow::{GradingFlow, SheetCtx};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// 处理单份答卷
///
/// # 参数
/// - `flow`: 评分流程（复用）
/// - `paper`: 试题卷
/// - `solution`: 答案卷（可选）
/// - `sheet_path`: 答卷 JSON 路径
/// - `sheet_index`: 答卷索引（用于日志）
pub async fn process_sheet(
    flow: &GradingFlow,
    paper: &QuestionPaper,
    solution: Option<&SolutionPaper>,
    sheet_path: &Path,
    sheet_index: usize,
) -> Result<()> {
    let mut sheet: AnswerSheet = load_json(sheet_path)
        .await
        .with_context(|| format!("[答卷 {}] 无法加载 {}", sheet_index, sheet_path.display()))?;

    // 报告文件按学号命名，缺学号时取答卷文件名
    if sheet.student_info.id.is_none() {
        sheet.student_info.id = sheet_id_from_path(sheet_path);
    }

    let ctx = SheetCtx::new(sheet_index, sheet.student_info.display_id());
    info!(
        "{} 📝 开始评分: {} ({} 条作答)",
        ctx,
        sheet_path.display(),
        sheet.total_answers
    );

    let (report, report_path) = flow.run(paper, solution, &sheet, &ctx).await?;

    info!(
        "{} ✓ {:.1}/{:.1} ({:.1}%) 等级 {} → {}",
        ctx,
        report.total_marks_awarded,
        report.total_marks_available,
        report.percentage,
        report.grade,
        report_path.display()
    );
    Ok(())
}

/// `answer_sheet_<学号>.json` → `<学号>`
fn sheet_id_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let id = stem.strip_prefix("answer_sheet_").unwrap_or(stem);
    (!id.is_empty()).then(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_id_from_path() {
        assert_eq!(
            sheet_id_from_path(Path::new("out/answer_sheet_alice.json")).as_deref(),
            Some("alice")
        );
        assert_eq!(sheet_id_from_path(Path::new("bob.json")).as_deref(), Some("bob"));
        assert_eq!(sheet_id_from_path(Path::new("out/answer_sheet_.json")), None);
    }
}
