pub mod grade;
pub mod loaders;
pub mod paper_kind;
pub mod question;
pub mod report;

pub use grade::LetterGrade;
pub use loaders::{find_completion_artifacts, load_json, load_transcript, save_json};
pub use paper_kind::PaperKind;
pub use question::{
    Answer, AnswerSheet, BoundingBox, Diagram, ExamMetadata, OcrPage, Question, QuestionPaper,
    QuestionType, SolutionPaper, StudentInfo, NO_ANSWER_PLACEHOLDER,
};
pub use report::{
    GradingMethod, GradingReport, GradingResult, PartialCreditBreakdown, ProcessingMetrics,
};
