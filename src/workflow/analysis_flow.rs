//! 结构分析流程 - 流程层
//!
//! 转写文本 → 结构分析 → JSON 产物

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::error::AnalysisError;
use crate::models::loaders::{
    load_json, load_transcripts, write_answer_sheet, write_processing_metrics,
    write_question_paper, write_solution_paper,
};
use crate::models::question::{AnswerSheet, OcrPage, QuestionPaper, SolutionPaper};
use crate::models::report::ProcessingMetrics;
use crate::services::StructureAnalyzer;
use crate::utils::logging::log_banner;

/// 结构分析流程
pub struct AnalysisFlow {
    analyzer: StructureAnalyzer,
    output_dir: PathBuf,
}

impl AnalysisFlow {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            analyzer: StructureAnalyzer::new(),
            output_dir: output_dir.into(),
        }
    }

    /// 分析试题卷（或答案卷），返回生成的 JSON 路径
    pub async fn analyze_paper(&self, transcripts: &[PathBuf], as_solution: bool) -> Result<PathBuf> {
        let title = if as_solution { "分析答案卷" } else { "分析试题卷" };
        log_banner(title);
        let started = Instant::now();

        let pages = load_pages(transcripts).await?;
        let (metadata, questions) = if as_solution {
            self.analyzer.analyze_solution_paper(&pages)
        } else {
            self.analyzer.analyze_question_paper(&pages)
        };

        if questions.is_empty() {
            return Err(AnalysisError::NoQuestions {
                path: transcripts.first().cloned().unwrap_or_default(),
            }
            .into());
        }

        let elapsed = started.elapsed().as_secs_f64();
        let path = if as_solution {
            write_solution_paper(&self.output_dir, &SolutionPaper::new(metadata, questions, elapsed))
                .await?
        } else {
            write_question_paper(&self.output_dir, &QuestionPaper::new(metadata, questions, elapsed))
                .await?
        };

        self.write_metrics(&pages, elapsed).await?;
        info!("✓ {} 完成，耗时 {:.2}s", title, elapsed);
        Ok(path)
    }

    /// 分析学生答卷，题号取自试题卷 JSON
    pub async fn analyze_answers(&self, transcripts: &[PathBuf], question_paper: &Path) -> Result<PathBuf> {
        log_banner("分析学生答卷");
        let started = Instant::now();

        let paper: QuestionPaper = load_json(question_paper)
            .await
            .with_context(|| format!("无法加载试题卷: {}", question_paper.display()))?;
        let pages = load_pages(transcripts).await?;

        let (mut student_info, answers) = self
            .analyzer
            .analyze_answer_sheet(&pages, &paper.question_numbers());

        // 没有识别出学号时用转写文件名，评分报告按学号命名
        if student_info.id.is_none() {
            student_info.id = transcripts
                .first()
                .and_then(|p| p.file_stem())
                .map(|s| s.to_string_lossy().into_owned());
        }
        let student_id = student_info.display_id().to_string();

        let elapsed = started.elapsed().as_secs_f64();
        let sheet = AnswerSheet::new(student_info, answers, elapsed);
        let path = write_answer_sheet(&self.output_dir, &student_id, &sheet).await?;

        self.write_metrics(&pages, elapsed).await?;
        info!("✓ 学生答卷分析完成，耗时 {:.2}s", elapsed);
        Ok(path)
    }

    async fn write_metrics(&self, pages: &[OcrPage], elapsed: f64) -> Result<()> {
        let metrics = ProcessingMetrics {
            total_pages: pages.len(),
            diagrams_extracted: pages.iter().map(|p| p.diagrams.len()).sum(),
            avg_ocr_confidence: if pages.is_empty() {
                0.0
            } else {
                pages.iter().map(|p| p.confidence).sum::<f64>() / pages.len() as f64
            },
            handwriting_pages: pages.iter().filter(|p| p.has_handwriting).count(),
            processing_time: elapsed,
            api_calls: 0,
            estimated_cost: 0.0,
        };
        write_processing_metrics(&self.output_dir, &metrics).await?;
        Ok(())
    }
}

async fn load_pages(transcripts: &[PathBuf]) -> Result<Vec<OcrPage>> {
    let pages = load_transcripts(transcripts).await?;
    if pages.is_empty() {
        return Err(AnalysisError::NoPages.into());
    }
    Ok(pages)
}
