pub mod analysis_flow;
pub mod grading_flow;
pub mod sheet_ctx;

pub use analysis_flow::AnalysisFlow;
pub use grading_flow::GradingFlow;
pub use sheet_ctx::SheetCtx;
