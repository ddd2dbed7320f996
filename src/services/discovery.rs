//! 输入发现服务 - 业务能力层
//!
//! 扫描输入目录，按文件名把 PDF 分为试题卷、答案卷、学生答卷

use crate::error::DiscoveryError;
use crate::models::paper_kind::PaperKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 发现结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredInputs {
    pub question: PathBuf,
    pub solution: Option<PathBuf>,
    pub answers: Vec<PathBuf>,
}

/// 扫描输入目录
///
/// - 目录不存在：创建后返回 `InputDirCreated`
/// - 没有任何匹配文件：返回 `NoMatchingPdfs`（附命名规则提示）
/// - 试题卷、学生答卷必须存在，答案卷可选
pub fn discover_inputs(input_dir: &Path) -> Result<DiscoveredInputs, DiscoveryError> {
    if !input_dir.is_dir() {
        std::fs::create_dir_all(input_dir).map_err(|source| DiscoveryError::ReadDirFailed {
            dir: input_dir.to_path_buf(),
            source,
        })?;
        return Err(DiscoveryError::InputDirCreated {
            path: input_dir.to_path_buf(),
        });
    }

    let read_err = |source| DiscoveryError::ReadDirFailed {
        dir: input_dir.to_path_buf(),
        source,
    };

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(input_dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut questions = Vec::new();
    let mut solutions = Vec::new();
    let mut answers = Vec::new();

    for path in files {
        match PaperKind::classify_path(&path) {
            Some(PaperKind::Question) => questions.push(path),
            Some(PaperKind::Solution) => solutions.push(path),
            Some(PaperKind::Answer) => answers.push(path),
            None => debug!("忽略文件: {}", path.display()),
        }
    }

    if questions.is_empty() && solutions.is_empty() && answers.is_empty() {
        return Err(DiscoveryError::NoMatchingPdfs {
            dir: input_dir.to_path_buf(),
            hint: PaperKind::usage_hint(),
        });
    }

    let question = pick_first(questions, PaperKind::Question)
        .ok_or(DiscoveryError::MissingQuestionPaper)?;
    let solution = pick_first(solutions, PaperKind::Solution);
    if answers.is_empty() {
        return Err(DiscoveryError::MissingAnswerSheets);
    }

    info!("📄 {}: {}", PaperKind::Question, question.display());
    match &solution {
        Some(path) => info!("📄 {}: {}", PaperKind::Solution, path.display()),
        None => info!("📄 {}: 未提供，将不使用标准答案", PaperKind::Solution),
    }
    info!("📄 {}: {} 份", PaperKind::Answer, answers.len());
    for path in &answers {
        info!("   - {}", path.display());
    }

    Ok(DiscoveredInputs {
        question,
        solution,
        answers,
    })
}

fn pick_first(candidates: Vec<PathBuf>, kind: PaperKind) -> Option<PathBuf> {
    if candidates.len() > 1 {
        warn!(
            "⚠️ 找到 {} 个{}，只使用第一个: {}",
            candidates.len(),
            kind,
            candidates[0].display()
        );
    }
    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"%PDF-1.4").unwrap();
    }

    #[test]
    fn test_missing_dir_is_created_and_fatal() {
        let root = tempfile::tempdir().unwrap();
        let input = root.path().join("data").join("input");

        let err = discover_inputs(&input).unwrap_err();
        assert!(matches!(err, DiscoveryError::InputDirCreated { .. }));
        assert!(input.is_dir());
    }

    #[test]
    fn test_classifies_by_name() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "midterm_question.pdf");
        touch(dir.path(), "midterm_solution.PDF");
        touch(dir.path(), "s01_answers.pdf");
        touch(dir.path(), "s02_answers.pdf");
        touch(dir.path(), "notes.pdf");
        std::fs::write(dir.path().join("exam.txt"), b"not a pdf").unwrap();

        let found = discover_inputs(dir.path()).unwrap();
        assert!(found.question.ends_with("midterm_question.pdf"));
        assert!(found.solution.unwrap().ends_with("midterm_solution.PDF"));
        assert_eq!(found.answers.len(), 2);
        assert!(found.answers[0].ends_with("s01_answers.pdf"));
    }

    #[test]
    fn test_no_matching_files_reports_hint() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "notes.pdf");

        let err = discover_inputs(dir.path()).unwrap_err();
        assert!(matches!(err, DiscoveryError::NoMatchingPdfs { .. }));
        assert!(err.to_string().contains("--answers"));
    }

    #[test]
    fn test_requires_question_and_answers() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "s01_answers.pdf");
        assert!(matches!(
            discover_inputs(dir.path()).unwrap_err(),
            DiscoveryError::MissingQuestionPaper
        ));

        touch(dir.path(), "exam.pdf");
        std::fs::remove_file(dir.path().join("s01_answers.pdf")).unwrap();
        assert!(matches!(
            discover_inputs(dir.path()).unwrap_err(),
            DiscoveryError::MissingAnswerSheets
        ));
    }

    #[test]
    fn test_multiple_question_papers_uses_first_by_name() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b_exam.pdf");
        touch(dir.path(), "a_exam.pdf");
        touch(dir.path(), "student1.pdf");

        let found = discover_inputs(dir.path()).unwrap();
        assert!(found.question.ends_with("a_exam.pdf"));
        assert!(found.solution.is_none());
    }
}
