//! # Exam Grader
//!
//! 试卷评分流水线的编排与评分工具
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 数据层（Models）
//! - `models/` - 试题卷、答案卷、学生答卷、评分报告
//! - `models/loaders` - JSON 产物与 OCR 转写文件的读写
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `StructureAnalyzer` - 把转写文本切分为题目和作答
//! - `GradingService` - 按题型评分（选择、数值、简答、推导、图像）
//! - `Monitor` / `check_results` - 等待和查看完成标志文件
//! - `discover_inputs` / `PipelineInvocation` - 发现 PDF、调用外部流水线
//! - `WarnWriter` - 写 warn.txt 能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一份答卷"的完整处理流程
//! - `SheetCtx` - 上下文封装（答卷索引 + 学号）
//! - `GradingFlow` - 流程编排（评分 → 写报告 → 摘要）
//! - `AnalysisFlow` - 转写 → 结构分析 → JSON
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量答卷处理器，管理并发
//! - `orchestrator/sheet_processor` - 单份答卷处理器
//! - `orchestrator/pipeline` - run / dispatch / monitor / check 子命令
//!
//! ## 模块结构

pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{AnswerSheet, GradingReport, Question, QuestionPaper, SolutionPaper};
pub use orchestrator::{process_sheet, App, ProcessingStats};
pub use workflow::{AnalysisFlow, GradingFlow, SheetCtx};
