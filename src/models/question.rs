use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 学生未作答时的占位文本
pub const NO_ANSWER_PLACEHOLDER: &str = "[No answer provided]";

/// 题型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Mcq,
    Numerical,
    ShortAnswer,
    Derivation,
    Proof,
    Diagram,
    Essay,
    Code,
    Mixed,
}

impl QuestionType {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::Mcq => "mcq",
            QuestionType::Numerical => "numerical",
            QuestionType::ShortAnswer => "short_answer",
            QuestionType::Derivation => "derivation",
            QuestionType::Proof => "proof",
            QuestionType::Diagram => "diagram",
            QuestionType::Essay => "essay",
            QuestionType::Code => "code",
            QuestionType::Mixed => "mixed",
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 百分比坐标的包围框
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

/// 从页面中抽取的图表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    pub diagram_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    pub image_path: String,
    #[serde(default = "default_relevance")]
    pub relevance: String,
    #[serde(default)]
    pub quality_score: f64,
}

fn default_relevance() -> String {
    "high".to_string()
}

/// 单页 OCR 转写结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrPage {
    pub text: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default = "default_engine")]
    pub engine: String,
    #[serde(default)]
    pub has_handwriting: bool,
    #[serde(default)]
    pub has_math: bool,
    #[serde(default = "default_quality")]
    pub quality: String,
    /// 该页抽取到的图表
    #[serde(default)]
    pub diagrams: Vec<Diagram>,
}

fn default_confidence() -> f64 {
    1.0
}

fn default_engine() -> String {
    "text".to_string()
}

fn default_quality() -> String {
    "good".to_string()
}

impl OcrPage {
    /// 纯文本页（置信度 1.0）
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: default_confidence(),
            engine: default_engine(),
            has_handwriting: false,
            has_math: false,
            quality: default_quality(),
            diagrams: Vec::new(),
        }
    }
}

/// 试卷中的一道题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question_number: String,
    #[serde(default)]
    pub sub_parts: Vec<String>,
    pub marks: f64,
    pub question_type: QuestionType,
    pub question_text: String,
    /// 选择题选项：{"a": "选项内容", ...}
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub has_diagram: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram_path: Option<String>,
    #[serde(default)]
    pub diagrams: Vec<Diagram>,
    /// 来自答案卷
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

impl Question {
    /// 是否有可用的标准答案
    pub fn has_correct_answer(&self) -> bool {
        self.correct_answer
            .as_deref()
            .is_some_and(|a| !a.trim().is_empty())
    }
}

/// 学生对某道题的作答
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question_number: String,
    pub answer_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working: Option<String>,
    #[serde(default)]
    pub has_diagram: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram_path: Option<String>,
    #[serde(default)]
    pub diagrams: Vec<Diagram>,
    pub ocr_confidence: f64,
    #[serde(default = "default_quality")]
    pub handwriting_quality: String,
}

impl Answer {
    /// 是否为空作答
    pub fn is_blank(&self) -> bool {
        let text = self.answer_text.trim();
        text.is_empty() || text == NO_ANSWER_PLACEHOLDER
    }

    /// 作答内容，附带解题过程
    pub fn text_with_working(&self) -> String {
        match &self.working {
            Some(working) => format!("{}\n\nWorking:\n{}", self.answer_text, working),
            None => self.answer_text.clone(),
        }
    }
}

/// 学生信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl StudentInfo {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }

    pub fn display_id(&self) -> &str {
        self.id.as_deref().unwrap_or("unknown")
    }
}

/// 试卷元信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamMetadata {
    #[serde(default)]
    pub exam_title: Option<String>,
    #[serde(default)]
    pub course_code: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub total_marks: Option<f64>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

/// 试题卷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionPaper {
    pub metadata: ExamMetadata,
    pub questions: Vec<Question>,
    pub total_questions: usize,
    pub processing_time: f64,
    pub created_at: DateTime<Local>,
}

impl QuestionPaper {
    pub fn new(metadata: ExamMetadata, questions: Vec<Question>, processing_time: f64) -> Self {
        Self {
            metadata,
            total_questions: questions.len(),
            questions,
            processing_time,
            created_at: Local::now(),
        }
    }

    pub fn question_numbers(&self) -> Vec<String> {
        self.questions
            .iter()
            .map(|q| q.question_number.clone())
            .collect()
    }
}

/// 答案卷（题目附带标准答案）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionPaper {
    pub metadata: ExamMetadata,
    pub solutions: Vec<Question>,
    pub total_questions: usize,
    pub processing_time: f64,
    pub created_at: DateTime<Local>,
}

impl SolutionPaper {
    pub fn new(metadata: ExamMetadata, solutions: Vec<Question>, processing_time: f64) -> Self {
        Self {
            metadata,
            total_questions: solutions.len(),
            solutions,
            processing_time,
            created_at: Local::now(),
        }
    }
}

/// 学生答卷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSheet {
    pub student_info: StudentInfo,
    pub answers: Vec<Answer>,
    pub total_answers: usize,
    pub processing_time: f64,
    pub created_at: DateTime<Local>,
}

impl AnswerSheet {
    pub fn new(student_info: StudentInfo, answers: Vec<Answer>, processing_time: f64) -> Self {
        Self {
            student_info,
            total_answers: answers.len(),
            answers,
            processing_time,
            created_at: Local::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_type_serializes_snake_case() {
        let json = serde_json::to_string(&QuestionType::ShortAnswer).unwrap();
        assert_eq!(json, "\"short_answer\"");
        let parsed: QuestionType = serde_json::from_str("\"mcq\"").unwrap();
        assert_eq!(parsed, QuestionType::Mcq);
    }

    #[test]
    fn test_answer_blank_detection() {
        let mut answer = Answer {
            question_number: "1".to_string(),
            answer_text: NO_ANSWER_PLACEHOLDER.to_string(),
            working: None,
            has_diagram: false,
            diagram_path: None,
            diagrams: Vec::new(),
            ocr_confidence: 0.9,
            handwriting_quality: "unknown".to_string(),
        };
        assert!(answer.is_blank());
        answer.answer_text = "42".to_string();
        assert!(!answer.is_blank());
    }

    #[test]
    fn test_ocr_page_defaults_when_fields_missing() {
        let page: OcrPage = serde_json::from_str(r#"{"text": "1. Find x (2 Marks)"}"#).unwrap();
        assert_eq!(page.confidence, 1.0);
        assert!(page.diagrams.is_empty());
    }
}
