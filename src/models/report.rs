use crate::models::question::StudentInfo;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// 评分方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingMethod {
    NoAnswer,
    ExactMatch,
    NumericalTolerance,
    MathEquivalence,
    SemanticSimilarity,
    AiVerification,
    AiPartialCredit,
    AiGrading,
    DiagramComparison,
}

impl GradingMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            GradingMethod::NoAnswer => "no_answer",
            GradingMethod::ExactMatch => "exact_match",
            GradingMethod::NumericalTolerance => "numerical_tolerance",
            GradingMethod::MathEquivalence => "math_equivalence",
            GradingMethod::SemanticSimilarity => "semantic_similarity",
            GradingMethod::AiVerification => "ai_verification",
            GradingMethod::AiPartialCredit => "ai_partial_credit",
            GradingMethod::AiGrading => "ai_grading",
            GradingMethod::DiagramComparison => "diagram_comparison",
        }
    }
}

impl std::fmt::Display for GradingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 部分得分明细
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialCreditBreakdown {
    #[serde(default)]
    pub method: f64,
    #[serde(default)]
    pub calculation: f64,
    #[serde(default)]
    pub final_answer: f64,
    #[serde(default)]
    pub presentation: f64,
}

/// 单题评分结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingResult {
    pub question_number: String,
    pub marks_available: f64,
    pub marks_awarded: f64,
    pub is_correct: bool,
    #[serde(default)]
    pub partial_credit: Option<PartialCreditBreakdown>,
    pub feedback: String,
    pub confidence: f64,
    pub grading_method: GradingMethod,
}

/// 学生评分报告（流水线的完成标志文件）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingReport {
    pub student_info: StudentInfo,
    pub results: Vec<GradingResult>,
    pub total_marks_available: f64,
    pub total_marks_awarded: f64,
    pub percentage: f64,
    pub grade: String,
    pub processing_time: f64,
    pub api_cost: f64,
    #[serde(default)]
    pub api_calls: usize,
    pub created_at: DateTime<Local>,
}

impl GradingReport {
    /// 控制台摘要
    pub fn summary_lines(&self, verbose: bool) -> Vec<String> {
        let mut lines = vec![
            format!("学生: {}", self.student_info.display_name()),
            format!("学号: {}", self.student_info.display_id()),
            format!(
                "总分: {:.1}/{:.1}",
                self.total_marks_awarded, self.total_marks_available
            ),
            format!("得分率: {:.2}%", self.percentage),
            format!("等级: {}", self.grade),
            format!("API 费用: ${:.4} ({} 次调用)", self.api_cost, self.api_calls),
            "-".repeat(60),
        ];
        for result in &self.results {
            let status = if result.is_correct { "✓" } else { "✗" };
            lines.push(format!(
                "{} Q{}: {:.1}/{:.1} [{}]",
                status,
                result.question_number,
                result.marks_awarded,
                result.marks_available,
                result.grading_method
            ));
            if verbose {
                lines.push(format!("   反馈: {}", result.feedback));
            }
        }
        lines
    }
}

/// 处理过程指标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMetrics {
    pub total_pages: usize,
    pub diagrams_extracted: usize,
    pub avg_ocr_confidence: f64,
    pub handwriting_pages: usize,
    pub processing_time: f64,
    pub api_calls: usize,
    pub estimated_cost: f64,
}
