//! 评分服务 - 业务能力层
//!
//! 按题型把每条作答路由到对应的评分规则：
//! 选择题精确匹配、数值题容差比较、推导/简答/图表题交给 `AiGrader`

use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::GradingError;
use crate::models::grade::LetterGrade;
use crate::models::question::{Answer, Question, QuestionType, StudentInfo};
use crate::models::report::{GradingMethod, GradingReport, GradingResult};
use crate::services::ai_grader::{AiGrader, AiGradingRequest, CostTracker, SimilarityScorer};
use crate::services::warn_writer::WarnWriter;
use crate::utils::math::{compare_expressions, error_percent, extract_numerical_value, Equivalence};

/// AI 得分达到满分的该比例即视为正确
const CORRECT_RATIO: f64 = 0.9;
/// 数值题满分/半分的误差上限（百分比）
const FULL_CREDIT_ERROR: f64 = 2.0;
const HALF_CREDIT_ERROR: f64 = 5.0;
/// 语义相似度低于该值时不再做 AI 复核
const VERIFY_SIMILARITY: f64 = 0.6;
const EXPRESSION_TOLERANCE: f64 = 0.02;

fn mcq_patterns() -> &'static [Regex; 4] {
    static PATTERNS: OnceLock<[Regex; 4]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"\b([a-e])\)").expect("valid regex"),
            Regex::new(r"\(([a-e])\)").expect("valid regex"),
            Regex::new(r"\b([a-e])\.").expect("valid regex"),
            Regex::new(r"\b([a-e])\b").expect("valid regex"),
        ]
    })
}

/// 评分服务
///
/// 职责：
/// - 对整份答卷逐题评分并汇总成报告
/// - 不关心答卷从哪里来、报告写到哪里
pub struct GradingService {
    ai: Arc<dyn AiGrader>,
    scorer: Option<Arc<dyn SimilarityScorer>>,
    warn_writer: Option<WarnWriter>,
    config: Config,
}

impl GradingService {
    /// 创建新的评分服务
    pub fn new(config: &Config, ai: Arc<dyn AiGrader>) -> Self {
        Self {
            ai,
            scorer: None,
            warn_writer: None,
            config: config.clone(),
        }
    }

    /// 启用语义相似度
    pub fn with_similarity_scorer(mut self, scorer: Arc<dyn SimilarityScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// 把找不到题目的作答写入 warn.txt
    pub fn with_warn_writer(mut self, warn_writer: WarnWriter) -> Self {
        self.warn_writer = Some(warn_writer);
        self
    }

    /// 对整份答卷评分
    ///
    /// 试题卷中不存在的题号会被跳过并记录警告
    pub async fn grade_answer_sheet(
        &self,
        questions: &[Question],
        answers: &[Answer],
        student_info: &StudentInfo,
    ) -> GradingReport {
        let started = Instant::now();
        info!("正在为学生 {} 评分...", student_info.display_name());

        let question_map: HashMap<&str, &Question> = questions
            .iter()
            .map(|q| (q.question_number.as_str(), q))
            .collect();

        let mut tracker = CostTracker::new(&self.config);
        let mut results = Vec::with_capacity(answers.len());

        for answer in answers {
            let Some(question) = question_map.get(answer.question_number.as_str()) else {
                warn!("⚠️ 题目 {} 不在试题卷中，跳过", answer.question_number);
                if let Some(writer) = &self.warn_writer {
                    if let Err(e) = writer.write(
                        student_info.display_id(),
                        &answer.question_number,
                        &answer.answer_text,
                    ) {
                        warn!("写入 warn.txt 失败: {}", e);
                    }
                }
                continue;
            };

            let result = self.grade_single_answer(question, answer, &mut tracker).await;
            if self.config.verbose {
                info!(
                    "Q{}: {:.1}/{:.1} ({})",
                    result.question_number,
                    result.marks_awarded,
                    result.marks_available,
                    result.grading_method
                );
            }
            results.push(result);
        }

        let total_marks_available: f64 = results.iter().map(|r| r.marks_available).sum();
        let total_marks_awarded: f64 = results.iter().map(|r| r.marks_awarded).sum();
        let percentage = if total_marks_available > 0.0 {
            total_marks_awarded / total_marks_available * 100.0
        } else {
            0.0
        };
        let grade = LetterGrade::from_percentage(percentage);

        info!(
            "✓ 评分完成: {:.1}/{:.1} ({:.1}%) - 等级: {}",
            total_marks_awarded, total_marks_available, percentage, grade
        );

        GradingReport {
            student_info: student_info.clone(),
            results,
            total_marks_available,
            total_marks_awarded,
            percentage,
            grade: grade.to_string(),
            processing_time: started.elapsed().as_secs_f64(),
            api_cost: tracker.total_cost(),
            api_calls: tracker.calls(),
            created_at: chrono::Local::now(),
        }
    }

    /// 对单条作答评分
    pub async fn grade_single_answer(
        &self,
        question: &Question,
        answer: &Answer,
        tracker: &mut CostTracker,
    ) -> GradingResult {
        if answer.is_blank() {
            return result(question, 0.0, false, "No answer provided", 1.0, GradingMethod::NoAnswer);
        }

        if !question.has_correct_answer() {
            info!("题目 {} 没有标准答案，使用 AI 评分", question.question_number);
            return self
                .grade_with_ai(question, answer, false, GradingMethod::AiGrading, "AI graded answer", tracker)
                .await;
        }

        match question.question_type {
            QuestionType::Mcq => grade_mcq(question, answer),
            QuestionType::Numerical => grade_numerical(question, answer),
            QuestionType::Derivation | QuestionType::Proof => {
                self.grade_derivation(question, answer, tracker).await
            }
            QuestionType::Diagram => self.grade_diagram(question, answer, tracker).await,
            _ => self.grade_short_answer(question, answer, tracker).await,
        }
    }

    async fn grade_derivation(
        &self,
        question: &Question,
        answer: &Answer,
        tracker: &mut CostTracker,
    ) -> GradingResult {
        if self.config.enable_partial_credit {
            return self
                .grade_with_ai(question, answer, true, GradingMethod::AiGrading, "Graded by AI", tracker)
                .await;
        }
        self.grade_short_answer(question, answer, tracker).await
    }

    async fn grade_short_answer(
        &self,
        question: &Question,
        answer: &Answer,
        tracker: &mut CostTracker,
    ) -> GradingResult {
        let Some(scorer) = &self.scorer else {
            info!("语义相似度不可用，改用 AI 评分");
            let partial = self.config.enable_partial_credit;
            return self
                .grade_with_ai(question, answer, partial, GradingMethod::AiGrading, "Graded by AI", tracker)
                .await;
        };

        let reference = question.correct_answer.as_deref().unwrap_or_default();
        let similarity = scorer.similarity(reference, &answer.answer_text);

        if similarity >= self.config.semantic_similarity_threshold {
            return result(
                question,
                question.marks,
                true,
                format!("Semantically correct (similarity: {:.2})", similarity),
                0.9,
                GradingMethod::SemanticSimilarity,
            );
        }

        if similarity >= VERIFY_SIMILARITY {
            info!("相似度中等 ({:.2})，交给 AI 复核", similarity);
            let fallback = format!("Verified with AI (similarity: {:.2})", similarity);
            return self
                .grade_with_ai(question, answer, false, GradingMethod::AiVerification, &fallback, tracker)
                .await;
        }

        if self.config.enable_partial_credit {
            info!("相似度较低 ({:.2})，检查部分得分", similarity);
            let fallback = format!("Low similarity (similarity: {:.2})", similarity);
            let mut graded = self
                .grade_with_ai(question, answer, false, GradingMethod::AiPartialCredit, &fallback, tracker)
                .await;
            graded.is_correct = false;
            return graded;
        }

        result(
            question,
            0.0,
            false,
            format!("Incorrect (similarity: {:.2})", similarity),
            0.85,
            GradingMethod::SemanticSimilarity,
        )
    }

    async fn grade_diagram(
        &self,
        question: &Question,
        answer: &Answer,
        tracker: &mut CostTracker,
    ) -> GradingResult {
        let feedback = match (
            question.has_diagram.then_some(question.diagram_path.as_deref()).flatten(),
            answer.has_diagram.then_some(answer.diagram_path.as_deref()).flatten(),
        ) {
            (_, None) => "Student did not provide diagram",
            (None, _) => "No reference diagram available",
            (Some(reference), Some(student)) => {
                return self
                    .compare_diagrams(question, Path::new(reference), Path::new(student), tracker)
                    .await;
            }
        };
        result(question, 0.0, false, feedback, 1.0, GradingMethod::DiagramComparison)
    }

    async fn compare_diagrams(
        &self,
        question: &Question,
        reference: &Path,
        student: &Path,
        tracker: &mut CostTracker,
    ) -> GradingResult {
        let comparison = match check_diagram(reference).and_then(|_| check_diagram(student)) {
            Ok(()) => self.ai.compare_diagrams(reference, student).await,
            Err(e) => Err(e),
        };

        let comparison = match comparison {
            Ok(comparison) => comparison,
            Err(e) => {
                error!("题目 {} 图表对比失败: {}", question.question_number, e);
                return result(
                    question,
                    0.0,
                    false,
                    format!("Diagram comparison error: {}", e),
                    0.0,
                    GradingMethod::DiagramComparison,
                );
            }
        };
        tracker.record(comparison.usage);

        let score = comparison.similarity_score;
        let (ratio, is_correct, verdict) = if score >= 0.8 {
            (1.0, true, "Diagram is correct")
        } else if score >= 0.6 {
            (0.7, false, "Diagram is mostly correct with minor issues")
        } else if score >= 0.4 {
            (0.4, false, "Diagram has significant issues")
        } else {
            (0.0, false, "Diagram is incorrect")
        };

        let mut feedback = format!("{} | Similarity: {:.2}", verdict, score);
        if !comparison.missing_elements.is_empty() {
            feedback.push_str(&format!(
                " | Missing: {}",
                comparison.missing_elements.join(", ")
            ));
        }

        result(
            question,
            question.marks * ratio,
            is_correct,
            feedback,
            comparison.confidence.unwrap_or(0.8),
            GradingMethod::DiagramComparison,
        )
    }

    /// 调用 AI 评分，任何失败都记 0 分
    async fn grade_with_ai(
        &self,
        question: &Question,
        answer: &Answer,
        partial_credit: bool,
        method: GradingMethod,
        default_feedback: &str,
        tracker: &mut CostTracker,
    ) -> GradingResult {
        let request = AiGradingRequest {
            question_number: question.question_number.clone(),
            question_type: question.question_type,
            question_text: question.question_text.clone(),
            marks: question.marks,
            reference_answer: question.correct_answer.clone().unwrap_or_default(),
            student_answer: answer.text_with_working(),
            partial_credit,
        };

        match self.ai.grade_answer(&request).await {
            Ok(response) => {
                tracker.record(response.usage);
                let marks = response.marks_awarded.clamp(0.0, question.marks.max(0.0));
                GradingResult {
                    question_number: question.question_number.clone(),
                    marks_available: question.marks,
                    marks_awarded: marks,
                    is_correct: marks >= question.marks * CORRECT_RATIO,
                    partial_credit: if partial_credit { response.partial_credit } else { None },
                    feedback: response
                        .feedback
                        .filter(|f| !f.trim().is_empty())
                        .unwrap_or_else(|| default_feedback.to_string()),
                    confidence: response.confidence.unwrap_or(0.8),
                    grading_method: method,
                }
            }
            Err(e) => {
                error!("题目 {} AI 评分失败: {}", question.question_number, e);
                result(
                    question,
                    0.0,
                    false,
                    format!("Grading error: {}", e),
                    0.0,
                    method,
                )
            }
        }
    }
}

fn check_diagram(path: &Path) -> Result<(), GradingError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(GradingError::DiagramMissing {
            path: path.to_path_buf(),
        })
    }
}

fn grade_mcq(question: &Question, answer: &Answer) -> GradingResult {
    let selected = extract_mcq_option(&answer.answer_text);
    let correct = extract_mcq_option(question.correct_answer.as_deref().unwrap_or_default());

    let is_correct = !selected.is_empty() && selected == correct;
    let marks = if is_correct { question.marks } else { 0.0 };

    result(
        question,
        marks,
        is_correct,
        format!("Selected: {}, Correct: {}", selected, correct),
        1.0,
        GradingMethod::ExactMatch,
    )
}

fn grade_numerical(question: &Question, answer: &Answer) -> GradingResult {
    let reference = question.correct_answer.as_deref().unwrap_or_default();
    let expected = extract_numerical_value(reference);
    let actual = extract_numerical_value(&answer.answer_text);

    let (Some(expected), Some(actual)) = (expected, actual) else {
        let equivalence = compare_expressions(reference, &answer.answer_text, EXPRESSION_TOLERANCE);
        if !equivalence.is_equivalent() {
            return result(
                question,
                0.0,
                false,
                "Could not extract numerical values for comparison",
                0.5,
                GradingMethod::NumericalTolerance,
            );
        }
        let marks = if equivalence == Equivalence::Exact {
            question.marks
        } else {
            question.marks * 0.9
        };
        return result(
            question,
            marks,
            true,
            format!("Mathematically equivalent ({})", equivalence.as_str()),
            0.9,
            GradingMethod::MathEquivalence,
        );
    };

    let error = error_percent(expected, actual);
    let (marks, is_correct, verdict) = if error <= FULL_CREDIT_ERROR {
        (question.marks, true, format!("Correct (error: {:.2}%)", error))
    } else if error <= HALF_CREDIT_ERROR {
        (
            question.marks * 0.5,
            false,
            format!("Close answer, 50% credit (error: {:.2}%)", error),
        )
    } else {
        (0.0, false, format!("Incorrect (error: {:.2}%)", error))
    };

    result(
        question,
        marks,
        is_correct,
        format!("{} | Correct: {}, Student: {}", verdict, expected, actual),
        0.95,
        GradingMethod::NumericalTolerance,
    )
}

/// 从作答中抽取选项字母，找不到时为空串
pub fn extract_mcq_option(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    mcq_patterns()
        .iter()
        .find_map(|pattern| pattern.captures(&lower))
        .map(|caps| caps[1].to_string())
        .unwrap_or_default()
}

fn result(
    question: &Question,
    marks_awarded: f64,
    is_correct: bool,
    feedback: impl Into<String>,
    confidence: f64,
    grading_method: GradingMethod,
) -> GradingResult {
    GradingResult {
        question_number: question.question_number.clone(),
        marks_available: question.marks,
        marks_awarded,
        is_correct,
        partial_credit: None,
        feedback: feedback.into(),
        confidence,
        grading_method,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::report::PartialCreditBreakdown;
    use crate::services::ai_grader::{
        AiGradingResponse, DiagramComparison, TokenUsage, UnavailableAiGrader,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedAi {
        marks: f64,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AiGrader for FixedAi {
        async fn grade_answer(
            &self,
            request: &AiGradingRequest,
        ) -> Result<AiGradingResponse, GradingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AiGradingResponse {
                marks_awarded: self.marks,
                feedback: Some(format!("graded Q{}", request.question_number)),
                confidence: None,
                partial_credit: Some(PartialCreditBreakdown {
                    method: 1.0,
                    ..Default::default()
                }),
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
            Ok(DiagramComparison {
                similarity_score: 0.65,
                missing_elements: vec!["ground".to_string()],
                confidence: Some(0.7),
                usage: None,
            })
        }
    }

    struct FixedScorer(f64);

    impl SimilarityScorer for FixedScorer {
        fn similarity(&self, _expected: &str, _actual: &str) -> f64 {
            self.0
        }
    }

    fn question(number: &str, kind: QuestionType, marks: f64, correct: Option<&str>) -> Question {
        Question {
            question_number: number.to_string(),
            sub_parts: Vec::new(),
            marks,
            question_type: kind,
            question_text: format!("Question {}", number),
            options: None,
            has_diagram: false,
            diagram_path: None,
            diagrams: Vec::new(),
            correct_answer: correct.map(str::to_string),
        }
    }

    fn answer(number: &str, text: &str) -> Answer {
        Answer {
            question_number: number.to_string(),
            answer_text: text.to_string(),
            working: None,
            has_diagram: false,
            diagram_path: None,
            diagrams: Vec::new(),
            ocr_confidence: 1.0,
            handwriting_quality: "good".to_string(),
        }
    }

    fn service(ai: Arc<dyn AiGrader>) -> GradingService {
        GradingService::new(&Config::default(), ai)
    }

    async fn grade(svc: &GradingService, q: &Question, a: &Answer) -> GradingResult {
        let mut tracker = CostTracker::new(&Config::default());
        svc.grade_single_answer(q, a, &mut tracker).await
    }

    #[test]
    fn test_extract_mcq_option() {
        assert_eq!(extract_mcq_option("B) Transistor"), "b");
        assert_eq!(extract_mcq_option("(c)"), "c");
        assert_eq!(extract_mcq_option("d."), "d");
        assert_eq!(extract_mcq_option("e"), "e");
        assert_eq!(extract_mcq_option("none"), "");
    }

    #[tokio::test]
    async fn test_blank_answer_scores_zero() {
        let svc = service(Arc::new(UnavailableAiGrader));
        let q = question("1", QuestionType::Mcq, 2.0, Some("a"));
        let r = grade(&svc, &q, &answer("1", "[No answer provided]")).await;
        assert_eq!(r.grading_method, GradingMethod::NoAnswer);
        assert_eq!(r.marks_awarded, 0.0);
        assert_eq!(r.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_mcq_requires_matching_letters() {
        let svc = service(Arc::new(UnavailableAiGrader));
        let q = question("1", QuestionType::Mcq, 2.0, Some("b) Transistor"));

        let right = grade(&svc, &q, &answer("1", "B")).await;
        assert!(right.is_correct);
        assert_eq!(right.marks_awarded, 2.0);

        let wrong = grade(&svc, &q, &answer("1", "a")).await;
        assert!(!wrong.is_correct);
        assert_eq!(wrong.feedback, "Selected: a, Correct: b");

        // 两边都抽不出字母不算对
        let q_none = question("2", QuestionType::Mcq, 2.0, Some("Transistor"));
        let none = grade(&svc, &q_none, &answer("2", "Transistor")).await;
        assert!(!none.is_correct);
    }

    #[tokio::test]
    async fn test_numerical_tolerance_tiers() {
        let svc = service(Arc::new(UnavailableAiGrader));
        let q = question("1", QuestionType::Numerical, 4.0, Some("50 ohms"));

        let full = grade(&svc, &q, &answer("1", "50.5")).await;
        assert_eq!(full.marks_awarded, 4.0);
        assert!(full.is_correct);

        let half = grade(&svc, &q, &answer("1", "52")).await;
        assert_eq!(half.marks_awarded, 2.0);
        assert!(!half.is_correct);

        let none = grade(&svc, &q, &answer("1", "60")).await;
        assert_eq!(none.marks_awarded, 0.0);
        assert_eq!(none.confidence, 0.95);
    }

    #[tokio::test]
    async fn test_numerical_falls_back_to_expression_equivalence() {
        let svc = service(Arc::new(UnavailableAiGrader));
        let q = question("1", QuestionType::Numerical, 2.0, Some("a*b + c"));

        let same = grade(&svc, &q, &answer("1", "a * b+c")).await;
        assert_eq!(same.grading_method, GradingMethod::MathEquivalence);
        assert_eq!(same.marks_awarded, 2.0);

        let different = grade(&svc, &q, &answer("1", "c - a")).await;
        assert_eq!(different.marks_awarded, 0.0);
        assert_eq!(different.confidence, 0.5);
    }

    #[tokio::test]
    async fn test_ai_failure_scores_zero_with_error_feedback() {
        let svc = service(Arc::new(UnavailableAiGrader));
        let q = question("3", QuestionType::Derivation, 5.0, None);
        let r = grade(&svc, &q, &answer("3", "P = V^2 / R")).await;
        assert_eq!(r.grading_method, GradingMethod::AiGrading);
        assert_eq!(r.marks_awarded, 0.0);
        assert_eq!(r.confidence, 0.0);
        assert!(r.feedback.starts_with("Grading error:"));
    }

    #[tokio::test]
    async fn test_derivation_uses_ai_partial_credit() {
        let ai = Arc::new(FixedAi {
            marks: 4.6,
            calls: AtomicUsize::new(0),
        });
        let svc = service(ai.clone());
        let q = question("4", QuestionType::Derivation, 5.0, Some("P = V^2/4R"));
        let r = grade(&svc, &q, &answer("4", "P = V^2/4R")).await;

        assert_eq!(ai.calls.load(Ordering::SeqCst), 1);
        assert!(r.is_correct);
        assert_eq!(r.partial_credit.map(|p| p.method), Some(1.0));
        assert_eq!(r.confidence, 0.8);
    }

    #[tokio::test]
    async fn test_ai_marks_clamped_to_available() {
        let ai = Arc::new(FixedAi {
            marks: 9.0,
            calls: AtomicUsize::new(0),
        });
        let svc = service(ai);
        let q = question("5", QuestionType::Essay, 3.0, None);
        let r = grade(&svc, &q, &answer("5", "Essay text")).await;
        assert_eq!(r.marks_awarded, 3.0);
    }

    #[tokio::test]
    async fn test_short_answer_similarity_tiers() {
        let ai = Arc::new(FixedAi {
            marks: 1.0,
            calls: AtomicUsize::new(0),
        });
        let q = question("6", QuestionType::ShortAnswer, 2.0, Some("Ohm's law"));

        let svc = service(ai.clone()).with_similarity_scorer(Arc::new(FixedScorer(0.85)));
        let high = grade(&svc, &q, &answer("6", "Ohm law")).await;
        assert_eq!(high.grading_method, GradingMethod::SemanticSimilarity);
        assert_eq!(high.marks_awarded, 2.0);

        let svc = service(ai.clone()).with_similarity_scorer(Arc::new(FixedScorer(0.7)));
        let medium = grade(&svc, &q, &answer("6", "Ohm law")).await;
        assert_eq!(medium.grading_method, GradingMethod::AiVerification);
        assert_eq!(medium.marks_awarded, 1.0);

        let svc = service(ai.clone()).with_similarity_scorer(Arc::new(FixedScorer(0.2)));
        let low = grade(&svc, &q, &answer("6", "Newton")).await;
        assert_eq!(low.grading_method, GradingMethod::AiPartialCredit);
        assert!(!low.is_correct);

        assert_eq!(ai.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_diagram_missing_on_student_side() {
        let svc = service(Arc::new(UnavailableAiGrader));
        let mut q = question("7", QuestionType::Diagram, 3.0, Some("see figure"));
        q.has_diagram = true;
        q.diagram_path = Some("ref.png".to_string());
        let r = grade(&svc, &q, &answer("7", "drawn below")).await;
        assert_eq!(r.grading_method, GradingMethod::DiagramComparison);
        assert_eq!(r.feedback, "Student did not provide diagram");
    }

    #[tokio::test]
    async fn test_diagram_similarity_scoring() {
        let dir = tempfile::tempdir().unwrap();
        let reference = dir.path().join("ref.png");
        let student = dir.path().join("student.png");
        std::fs::write(&reference, b"png").unwrap();
        std::fs::write(&student, b"png").unwrap();

        let svc = service(Arc::new(FixedAi {
            marks: 0.0,
            calls: AtomicUsize::new(0),
        }));
        let mut q = question("8", QuestionType::Diagram, 10.0, Some("see figure"));
        q.has_diagram = true;
        q.diagram_path = Some(reference.display().to_string());
        let mut a = answer("8", "see drawing");
        a.has_diagram = true;
        a.diagram_path = Some(student.display().to_string());

        let r = grade(&svc, &q, &a).await;
        assert!((r.marks_awarded - 7.0).abs() < 1e-9);
        assert!(r.feedback.contains("Missing: ground"));
        assert_eq!(r.confidence, 0.7);
    }

    #[tokio::test]
    async fn test_grade_answer_sheet_totals_and_skips_unknown_questions() {
        let dir = tempfile::tempdir().unwrap();
        let ai = Arc::new(FixedAi {
            marks: 0.0,
            calls: AtomicUsize::new(0),
        });
        let svc = service(ai).with_warn_writer(WarnWriter::new(dir.path()));
        let questions = vec![
            question("1", QuestionType::Mcq, 2.0, Some("a")),
            question("2", QuestionType::Numerical, 2.0, Some("10")),
        ];
        let answers = vec![answer("1", "a"), answer("2", "10"), answer("9", "stray")];
        let info = StudentInfo {
            name: Some("Jane Doe".to_string()),
            id: Some("S1".to_string()),
            email: None,
        };

        let report = svc.grade_answer_sheet(&questions, &answers, &info).await;
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.total_marks_awarded, 4.0);
        assert_eq!(report.percentage, 100.0);
        assert_eq!(report.grade, "A+");
        assert_eq!(report.api_cost, 0.0);
        assert_eq!(report.api_calls, 0);

        let warn = std::fs::read_to_string(dir.path().join("warn.txt")).unwrap();
        assert!(warn.contains("题目 9"));
    }

    #[tokio::test]
    async fn test_empty_sheet_has_zero_percentage() {
        let svc = service(Arc::new(UnavailableAiGrader));
        let report = svc
            .grade_answer_sheet(&[], &[], &StudentInfo::default())
            .await;
        assert_eq!(report.percentage, 0.0);
        assert_eq!(report.grade, "F");
    }
}
