pub mod ai_grader;
pub mod discovery;
pub mod dispatch;
pub mod grading_service;
pub mod monitor;
pub mod result_check;
pub mod structure_analyzer;
pub mod warn_writer;

pub use ai_grader::{
    AiGrader, AiGradingRequest, AiGradingResponse, CostTracker, DiagramComparison,
    SimilarityScorer, TokenUsage, UnavailableAiGrader,
};
pub use discovery::{discover_inputs, DiscoveredInputs};
pub use dispatch::{confirm, PipelineInvocation};
pub use grading_service::GradingService;
pub use monitor::{Monitor, MonitorOutcome};
pub use result_check::{check_results, CheckOutcome};
pub use structure_analyzer::StructureAnalyzer;
pub use warn_writer::WarnWriter;
