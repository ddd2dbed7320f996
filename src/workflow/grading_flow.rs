//! 答卷评分流程 - 流程层
//!
//! 核心职责：定义"一份答卷"的完整评分流程
//!
//! 流程顺序：
//! 1. 选题目来源（有答案卷用答案卷，否则用试题卷）
//! 2. 逐题评分
//! 3. 写出 grading_report_<学号>.json（完成标志文件）
//! 4. 打印摘要

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::models::loaders::write_grading_report;
use crate::models::question::{AnswerSheet, Question, QuestionPaper, SolutionPaper};
use crate::models::report::GradingReport;
use crate::services::{AiGrader, GradingService, SimilarityScorer, WarnWriter};
use crate::utils::logging::log_banner;
use crate::workflow::sheet_ctx::SheetCtx;

/// 答卷评分流程
///
/// - 编排单份答卷的评分与落盘
/// - 只依赖业务能力（services）
pub struct GradingFlow {
    grading: GradingService,
    output_dir: PathBuf,
    verbose: bool,
}

impl GradingFlow {
    /// 创建新的评分流程
    pub fn new(config: &Config, ai: Arc<dyn AiGrader>) -> Self {
        let grading =
            GradingService::new(config, ai).with_warn_writer(WarnWriter::new(&config.output_dir));
        Self {
            grading,
            output_dir: config.output_dir.clone(),
            verbose: config.verbose,
        }
    }

    /// 启用语义相似度
    pub fn with_similarity_scorer(mut self, scorer: Arc<dyn SimilarityScorer>) -> Self {
        self.grading = self.grading.with_similarity_scorer(scorer);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 评分并写出报告
    pub async fn run(
        &self,
        paper: &QuestionPaper,
        solution: Option<&SolutionPaper>,
        sheet: &AnswerSheet,
        ctx: &SheetCtx,
    ) -> Result<(GradingReport, PathBuf)> {
        let questions: &[Question] = match solution {
            Some(solution) => {
                info!("{} 使用答案卷中的 {} 道题", ctx, solution.solutions.len());
                &solution.solutions
            }
            None => {
                info!("{} 没有答案卷，使用试题卷中的 {} 道题", ctx, paper.questions.len());
                &paper.questions
            }
        };

        info!("{} 正在评分 {} 条作答...", ctx, sheet.answers.len());
        let report = self
            .grading
            .grade_answer_sheet(questions, &sheet.answers, &sheet.student_info)
            .await;

        let path = write_grading_report(&self.output_dir, &report)
            .await
            .with_context(|| format!("{} 保存评分报告失败", ctx))?;

        self.log_summary(&report);
        Ok((report, path))
    }

    fn log_summary(&self, report: &GradingReport) {
        log_banner("评分摘要");
        for line in report.summary_lines(self.verbose) {
            info!("{}", line);
        }
        info!("{}", "=".repeat(60));
    }
}
