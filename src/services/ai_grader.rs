//! AI 评分接口 - 业务能力层
//!
//! 只定义"AI 评分"能力的接口；具体的 HTTP 实现不在本 crate 内
//!
//! ## 接口
//! - `AiGrader` - 文字作答评分、图表对比
//! - `SimilarityScorer` - 语义相似度（可选）
//! - `CostTracker` - 按 token 计费

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::Config;
use crate::error::GradingError;
use crate::models::question::QuestionType;
use crate::models::report::PartialCreditBreakdown;

/// 单次调用的 token 用量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// AI 评分请求
#[derive(Debug, Clone, Serialize)]
pub struct AiGradingRequest {
    pub question_number: String,
    pub question_type: QuestionType,
    pub question_text: String,
    pub marks: f64,
    /// 参考答案，没有时为空
    pub reference_answer: String,
    /// 学生作答（含解题过程）
    pub student_answer: String,
    /// 是否需要给出部分得分明细
    pub partial_credit: bool,
}

/// AI 评分响应
#[derive(Debug, Clone, Deserialize)]
pub struct AiGradingResponse {
    #[serde(default)]
    pub marks_awarded: f64,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub partial_credit: Option<PartialCreditBreakdown>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

/// 图表对比结果
#[derive(Debug, Clone, Deserialize)]
pub struct DiagramComparison {
    #[serde(default)]
    pub similarity_score: f64,
    #[serde(default)]
    pub missing_elements: Vec<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

/// AI 评分能力
#[async_trait]
pub trait AiGrader: Send + Sync {
    /// 对一条文字作答评分
    async fn grade_answer(
        &self,
        request: &AiGradingRequest,
    ) -> Result<AiGradingResponse, GradingError>;

    /// 对比参考图与学生图
    async fn compare_diagrams(
        &self,
        reference: &Path,
        student: &Path,
    ) -> Result<DiagramComparison, GradingError>;
}

/// 未配置 AI 服务时使用，所有调用都返回 `AiUnavailable`
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableAiGrader;

#[async_trait]
impl AiGrader for UnavailableAiGrader {
    async fn grade_answer(
        &self,
        _request: &AiGradingRequest,
    ) -> Result<AiGradingResponse, GradingError> {
        Err(GradingError::AiUnavailable)
    }

    async fn compare_diagrams(
        &self,
        _reference: &Path,
        _student: &Path,
    ) -> Result<DiagramComparison, GradingError> {
        Err(GradingError::AiUnavailable)
    }
}

/// 语义相似度，返回 0.0 ~ 1.0
pub trait SimilarityScorer: Send + Sync {
    fn similarity(&self, expected: &str, actual: &str) -> f64;
}

/// API 费用统计
#[derive(Debug, Clone, Default)]
pub struct CostTracker {
    input_token_cost: f64,
    output_token_cost: f64,
    usage: TokenUsage,
    calls: usize,
}

impl CostTracker {
    pub fn new(config: &Config) -> Self {
        Self {
            input_token_cost: config.input_token_cost,
            output_token_cost: config.output_token_cost,
            ..Default::default()
        }
    }

    /// 记录一次调用
    pub fn record(&mut self, usage: Option<TokenUsage>) {
        self.calls += 1;
        if let Some(usage) = usage {
            self.usage.input_tokens += usage.input_tokens;
            self.usage.output_tokens += usage.output_tokens;
        }
    }

    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn total_cost(&self) -> f64 {
        self.usage.input_tokens as f64 * self.input_token_cost
            + self.usage.output_tokens as f64 * self.output_token_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_tracker_accumulates() {
        let mut tracker = CostTracker::new(&Config::default());
        tracker.record(Some(TokenUsage {
            input_tokens: 1_000_000,
            output_tokens: 0,
        }));
        tracker.record(Some(TokenUsage {
            input_tokens: 0,
            output_tokens: 1_000_000,
        }));
        tracker.record(None);

        assert_eq!(tracker.calls(), 3);
        assert!((tracker.total_cost() - 18.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unavailable_grader_always_errors() {
        let grader = UnavailableAiGrader;
        let err = grader
            .compare_diagrams(Path::new("a.png"), Path::new("b.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, GradingError::AiUnavailable));
    }

    #[test]
    fn test_response_defaults_missing_fields() {
        let response: AiGradingResponse = serde_json::from_str(r#"{"marks_awarded": 2.5}"#).unwrap();
        assert_eq!(response.marks_awarded, 2.5);
        assert!(response.feedback.is_none());
        assert!(response.partial_credit.is_none());
    }
}
