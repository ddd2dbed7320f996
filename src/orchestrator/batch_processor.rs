//! 批量答卷处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是 `grade` 命令的入口，负责批量答卷的评分调度。
//!
//! ## 核心功能
//!
//! 1. **加载试卷**：试题卷、答案卷只加载一次，所有答卷共享
//! 2. **并发控制**：使用 Semaphore 限制同时评分的答卷数量
//! 3. **分批处理**：每批完成后再开始下一批
//! 4. **全局统计**：汇总所有答卷的处理结果
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单份答卷的细节
//! - **向下委托**：委托 sheet_processor 处理单份答卷

use crate::config::Config;
use crate::models::loaders::load_json;
use crate::models::question::{QuestionPaper, SolutionPaper};
use crate::orchestrator::sheet_processor;
use crate::services::AiGrader;
use crate::utils::logging::{log_batch_complete, log_batch_start, print_final_stats};
use crate::workflow::GradingFlow;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    flow: Arc<GradingFlow>,
}

/// 处理统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingStats {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
}

/// 批次处理结果
#[derive(Debug, Default)]
struct BatchResult {
    success: usize,
    failed: usize,
}

impl App {
    /// 初始化应用
    pub fn new(config: Config, ai: Arc<dyn AiGrader>) -> Self {
        let flow = Arc::new(GradingFlow::new(&config, ai));
        Self { config, flow }
    }

    /// 批量评分
    pub async fn run(
        &self,
        question_paper: &Path,
        solution_paper: Option<&Path>,
        sheets: &[PathBuf],
    ) -> Result<ProcessingStats> {
        if sheets.is_empty() {
            warn!("⚠️ 没有待评分的答卷，程序结束");
            return Ok(ProcessingStats::default());
        }

        let paper: QuestionPaper = load_json(question_paper)
            .await
            .with_context(|| format!("无法加载试题卷: {}", question_paper.display()))?;
        let solution: Option<SolutionPaper> = match solution_paper {
            Some(path) => Some(
                load_json(path)
                    .await
                    .with_context(|| format!("无法加载答案卷: {}", path.display()))?,
            ),
            None => None,
        };

        let max_concurrent = self.config.max_concurrent_sheets.max(1);
        log_startup(sheets.len(), max_concurrent);

        let stats = self
            .process_all_sheets(Arc::new(paper), Arc::new(solution), sheets, max_concurrent)
            .await?;

        print_final_stats(stats.success, stats.failed, stats.total, self.flow.output_dir());
        Ok(stats)
    }

    /// 处理所有答卷
    async fn process_all_sheets(
        &self,
        paper: Arc<QuestionPaper>,
        solution: Arc<Option<SolutionPaper>>,
        sheets: &[PathBuf],
        max_concurrent: usize,
    ) -> Result<ProcessingStats> {
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let total_sheets = sheets.len();
        let total_batches = total_sheets.div_ceil(max_concurrent);
        let mut stats = ProcessingStats {
            total: total_sheets,
            ..Default::default()
        };

        // 分批处理
        for batch_start in (0..total_sheets).step_by(max_concurrent) {
            let batch_end = (batch_start + max_concurrent).min(total_sheets);
            let batch_num = batch_start / max_concurrent + 1;

            log_batch_start(batch_num, total_batches, batch_start + 1..=batch_end, total_sheets);

            let batch_result = self
                .process_batch(
                    &sheets[batch_start..batch_end],
                    batch_start,
                    paper.clone(),
                    solution.clone(),
                    semaphore.clone(),
                )
                .await?;

            stats.success += batch_result.success;
            stats.failed += batch_result.failed;

            log_batch_complete(batch_num, batch_result.success, batch_result.failed);
        }

        Ok(stats)
    }

    /// 处理单个批次
    async fn process_batch(
        &self,
        batch_sheets: &[PathBuf],
        batch_start: usize,
        paper: Arc<QuestionPaper>,
        solution: Arc<Option<SolutionPaper>>,
        semaphore: Arc<Semaphore>,
    ) -> Result<BatchResult> {
        let mut batch_handles = Vec::new();

        for (idx, sheet_path) in batch_sheets.iter().enumerate() {
            let sheet_index = batch_start + idx + 1;
            let permit = semaphore.clone().acquire_owned().await?;

            let flow = self.flow.clone();
            let paper = paper.clone();
            let solution = solution.clone();
            let sheet_path = sheet_path.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                sheet_processor::process_sheet(
                    &flow,
                    &paper,
                    (*solution).as_ref(),
                    &sheet_path,
                    sheet_index,
                )
                .await
                .inspect_err(|e| error!("[答卷 {}] ❌ 处理过程中发生错误: {:#}", sheet_index, e))
            });
            batch_handles.push((sheet_index, handle));
        }

        // 等待本批所有任务完成
        let mut result = BatchResult::default();

        for (sheet_index, handle) in batch_handles {
            match handle.await {
                Ok(Ok(())) => result.success += 1,
                Ok(Err(_)) => result.failed += 1,
                Err(e) => {
                    error!("[答卷 {}] 任务执行失败: {}", sheet_index, e);
                    result.failed += 1;
                }
            }
        }

        Ok(result)
    }
}

fn log_startup(total: usize, max_concurrent: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 开始批量评分");
    info!("✓ 找到 {} 份待评分的答卷", total);
    info!("📋 将以每批 {} 份的方式处理", max_concurrent);
    info!("{}", "=".repeat(60));
}
