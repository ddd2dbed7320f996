use std::path::Path;

/// 输入 PDF 的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperKind {
    /// 试题卷
    Question,
    /// 答案卷 / 评分标准
    Solution,
    /// 学生答卷
    Answer,
}

/// 各类别的文件名关键字，按匹配优先级排列
const SOLUTION_KEYWORDS: &[&str] = &["solution", "marking", "scheme", "answer_key", "answerkey", "memo"];
const ANSWER_KEYWORDS: &[&str] = &["answer", "student", "response", "submission", "script"];
const QUESTION_KEYWORDS: &[&str] = &["question", "paper", "exam", "test", "quiz"];

impl PaperKind {
    /// 所有类别，按匹配优先级排列
    pub const ALL: [PaperKind; 3] = [PaperKind::Solution, PaperKind::Answer, PaperKind::Question];

    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            PaperKind::Question => "试题卷",
            PaperKind::Solution => "答案卷",
            PaperKind::Answer => "学生答卷",
        }
    }

    /// 文件名关键字
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            PaperKind::Question => QUESTION_KEYWORDS,
            PaperKind::Solution => SOLUTION_KEYWORDS,
            PaperKind::Answer => ANSWER_KEYWORDS,
        }
    }

    /// 对应的流水线参数
    pub fn flag(self) -> &'static str {
        match self {
            PaperKind::Question => "--question",
            PaperKind::Solution => "--solution",
            PaperKind::Answer => "--answers",
        }
    }

    /// 根据文件名（不含扩展名）判断类别
    ///
    /// 答案卷优先于学生答卷，学生答卷优先于试题卷，
    /// 因此 `exam_solution.pdf` 归为答案卷，`exam_answers.pdf` 归为学生答卷
    pub fn classify_stem(stem: &str) -> Option<Self> {
        let stem = stem.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.keywords().iter().any(|kw| stem.contains(kw)))
    }

    /// 根据路径判断类别，非 PDF 文件返回 None
    pub fn classify_path(path: &Path) -> Option<Self> {
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            return None;
        }
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(Self::classify_stem)
    }

    /// 命名规则提示，用于没有匹配文件时的错误信息
    pub fn usage_hint() -> String {
        let mut hint = String::from("文件名需包含以下关键字之一（不区分大小写）：\n");
        for kind in [PaperKind::Question, PaperKind::Solution, PaperKind::Answer] {
            hint.push_str(&format!(
                "  {} ({}): {}\n",
                kind.name(),
                kind.flag(),
                kind.keywords().join(", ")
            ));
        }
        hint.push_str("例如: midterm_question.pdf, midterm_solution.pdf, student01_answers.pdf");
        hint
    }
}

impl std::fmt::Display for PaperKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
