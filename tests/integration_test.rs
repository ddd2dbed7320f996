use async_trait::async_trait;
use exam_grader::error::{DiscoveryError, GradingError};
use exam_grader::models::{
    find_completion_artifacts, load_json, save_json, AnswerSheet, GradingReport, StudentInfo,
};
use exam_grader::services::{
    check_results, discover_inputs, AiGrader, AiGradingRequest, AiGradingResponse, CheckOutcome,
    DiagramComparison, Monitor, MonitorOutcome, TokenUsage,
};
use exam_grader::{AnalysisFlow, App, Config};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 每题给一半分的 AI
struct HalfMarksAi;

#[async_trait]
impl AiGrader for HalfMarksAi {
    async fn grade_answer(
        &self,
        request: &AiGradingRequest,
    ) -> Result<AiGradingResponse, GradingError> {
        Ok(AiGradingResponse {
            marks_awarded: request.marks / 2.0,
            feedback: Some("half".to_string()),
            confidence: Some(0.8),
            partial_credit: None,
            usage: Some(TokenUsage {
                input_tokens: 1000,
                output_tokens: 100,
            }),
        })
    }

    async fn compare_diagrams(
        &self,
        _reference: &Path,
        _student: &Path,
    ) -> Result<DiagramComparison, GradingError> {
        Err(GradingError::AiUnavailable)
    }
}

fn touch(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), b"%PDF-1.4").unwrap();
}

#[test]
fn test_discovery_classifies_by_file_name() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "midterm_question.pdf");
    touch(dir.path(), "midterm_solution.pdf");
    touch(dir.path(), "s02_answers.pdf");
    touch(dir.path(), "s01_answers.pdf");
    touch(dir.path(), "holiday.pdf");
    std::fs::write(dir.path().join("question_notes.txt"), "not a pdf").unwrap();

    let inputs = discover_inputs(dir.path()).unwrap();
    assert!(inputs.question.ends_with("midterm_question.pdf"));
    assert!(inputs.solution.unwrap().ends_with("midterm_solution.pdf"));
    assert_eq!(inputs.answers.len(), 2);
    assert!(inputs.answers[0].ends_with("s01_answers.pdf"));
    assert!(inputs.answers[1].ends_with("s02_answers.pdf"));
}

#[test]
fn test_discovery_creates_missing_input_dir() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("data").join("input");

    let err = discover_inputs(&input).unwrap_err();
    assert!(matches!(err, DiscoveryError::InputDirCreated { .. }));
    assert!(input.is_dir());
}

#[test]
fn test_discovery_without_matches_reports_hint() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "holiday.pdf");

    let err = discover_inputs(dir.path()).unwrap_err();
    assert!(matches!(err, DiscoveryError::NoMatchingPdfs { .. }));
    assert!(err.to_string().contains("--answers"));
}

#[tokio::test]
async fn test_monitor_is_bounded_by_max_checks() {
    let dir = tempfile::tempdir().unwrap();
    let monitor = Monitor::new(
        dir.path(),
        dir.path().join("full_run.log"),
        Duration::from_millis(20),
        3,
        5,
    );

    let started = Instant::now();
    let outcome = monitor.run().await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(outcome, MonitorOutcome::TimedOut { checks: 3 });
    assert!(elapsed >= Duration::from_millis(40));
    assert!(elapsed < Duration::from_secs(5));
}

#[tokio::test]
async fn test_analyze_grade_and_check_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("output");
    let paper_txt = dir.path().join("paper.txt");
    let sheet_txt = dir.path().join("s01.txt");
    std::fs::write(
        &paper_txt,
        "1. Calculate the gain. (2 Marks)\n2. Explain feedback. (3 Marks)\n",
    )
    .unwrap();
    std::fs::write(
        &sheet_txt,
        "Student ID: S01\nQ1: 20 dB\nQ2: It reduces gain.\n",
    )
    .unwrap();

    let analysis = AnalysisFlow::new(&out);
    let paper_json = analysis.analyze_paper(&[paper_txt], false).await.unwrap();
    let sheet_json = analysis
        .analyze_answers(&[sheet_txt], &paper_json)
        .await
        .unwrap();

    let config = Config {
        output_dir: out.clone(),
        logs_dir: dir.path().join("logs"),
        run_log_file: dir.path().join("full_run.log"),
        verbose: false,
        ..Config::default()
    };
    let app = App::new(config, Arc::new(HalfMarksAi));
    let stats = tokio_test::assert_ok!(app.run(&paper_json, None, &[sheet_json]).await);
    assert_eq!((stats.success, stats.failed, stats.total), (1, 0, 1));

    let artifacts = find_completion_artifacts(&out).unwrap();
    assert_eq!(artifacts.len(), 1);
    let report: GradingReport = load_json(&artifacts[0]).await.unwrap();
    assert_eq!(report.student_info.id.as_deref(), Some("S01"));
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.percentage, 50.0);
    assert!(report.api_cost > 0.0);
    assert_eq!(report.api_calls, 2);

    let outcome = check_results(
        &out,
        &dir.path().join("full_run.log"),
        &dir.path().join("logs"),
        5,
    )
    .await
    .unwrap();
    assert_eq!(outcome.exit_code(), 0);
    assert!(matches!(outcome, CheckOutcome::Report { .. }));

    let monitor = Monitor::new(&out, dir.path().join("full_run.log"), Duration::from_secs(30), 10, 5);
    let started = Instant::now();
    assert!(matches!(monitor.run().await.unwrap(), MonitorOutcome::Completed(_)));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_batch_counts_unreadable_sheets_as_failed() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("output");
    let paper_txt = dir.path().join("paper.txt");
    std::fs::write(&paper_txt, "1. Define gain. (2 Marks)\n").unwrap();

    let paper_json = AnalysisFlow::new(&out)
        .analyze_paper(&[paper_txt], false)
        .await
        .unwrap();

    let config = Config {
        output_dir: out,
        max_concurrent_sheets: 2,
        ..Config::default()
    };
    let app = App::new(config, Arc::new(HalfMarksAi));
    let stats = app
        .run(&paper_json, None, &[dir.path().join("missing.json")])
        .await
        .unwrap();
    assert_eq!((stats.success, stats.failed, stats.total), (0, 1, 1));
}

#[tokio::test]
async fn test_sheets_without_ids_get_separate_reports() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("output");
    let paper_txt = dir.path().join("paper.txt");
    std::fs::write(&paper_txt, "1. Define gain. (2 Marks)\n").unwrap();

    let analysis = AnalysisFlow::new(&out);
    let paper_json = analysis.analyze_paper(&[paper_txt], false).await.unwrap();

    let mut sheets = Vec::new();
    for (stem, text) in [("alice", "Q1: a\n"), ("bob", "Q1: b\n")] {
        let transcript = dir.path().join(format!("{}.txt", stem));
        std::fs::write(&transcript, text).unwrap();
        sheets.push(
            analysis
                .analyze_answers(&[transcript], &paper_json)
                .await
                .unwrap(),
        );
    }

    // 手工生成、没有学号的答卷
    let carol: AnswerSheet = load_json(&sheets[0]).await.unwrap();
    let carol = AnswerSheet::new(StudentInfo::default(), carol.answers, 0.0);
    let carol_path = out.join("answer_sheet_carol.json");
    save_json(&carol_path, &carol).await.unwrap();
    sheets.push(carol_path);

    let config = Config {
        output_dir: out.clone(),
        max_concurrent_sheets: 3,
        ..Config::default()
    };
    let stats = App::new(config, Arc::new(HalfMarksAi))
        .run(&paper_json, None, &sheets)
        .await
        .unwrap();
    assert_eq!((stats.success, stats.failed), (3, 0));

    let mut names: Vec<String> = find_completion_artifacts(&out)
        .unwrap()
        .iter()
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "grading_report_alice.json",
            "grading_report_bob.json",
            "grading_report_carol.json",
        ]
    );
}
