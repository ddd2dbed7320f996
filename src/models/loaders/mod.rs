pub mod json_loader;

pub use json_loader::{
    find_completion_artifacts, load_json, load_transcript, load_transcripts, save_json,
    write_answer_sheet, write_grading_report, write_processing_metrics, write_question_paper,
    write_solution_paper, COMPLETION_PREFIX,
};
