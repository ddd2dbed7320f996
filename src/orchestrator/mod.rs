//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责命令调度、批量处理和统计，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `pipeline` - 外部流水线命令
//! - `run`：加载 .env、准备目录、启动流水线并写运行日志
//! - `dispatch`：发现 PDF、确认命令行、执行并传递退出码
//! - `monitor` / `check`：等待完成标志文件、查看结果
//!
//! ### `batch_processor` - 批量答卷处理器
//! - 加载试题卷、答案卷（所有答卷共享）
//! - 控制并发数量（Semaphore）
//! - 输出全局统计信息
//!
//! ### `sheet_processor` - 单份答卷处理器
//! - 加载答卷 JSON
//! - 创建 SheetCtx，委托 GradingFlow
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<答卷>)
//!     ↓
//! sheet_processor (处理单份答卷)
//!     ↓
//! workflow::GradingFlow (评分 + 写报告)
//!     ↓
//! services (能力层：grading / ai / warn)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：batch_processor 管批量，sheet_processor 管单份
//! 2. **向下依赖**：编排层 → workflow → services → models
//! 3. **无业务逻辑**：只做调度和统计，不做具体评分判断

pub mod batch_processor;
pub mod pipeline;
pub mod sheet_processor;

// 重新导出主要类型
pub use batch_processor::{App, ProcessingStats};
pub use sheet_processor::process_sheet;
