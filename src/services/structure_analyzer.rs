//! 结构分析服务 - 业务能力层
//!
//! 把 OCR 转写文本切分为题目、小问和分值，并把学生作答按题号对应到题目上。
//! 只做确定性的文本规则，不调用任何外部服务。

use crate::models::question::{
    Answer, Diagram, ExamMetadata, OcrPage, Question, QuestionType, StudentInfo,
    NO_ANSWER_PLACEHOLDER,
};
use regex::Regex;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// 元信息只在开头这么多字符内查找标题和日期
const HEADER_SCAN_CHARS: usize = 500;
/// 判断"换题"关键词时只看段首这么多字符
const TOPIC_SCAN_CHARS: usize = 100;
/// 作答超过该长度才尝试拆分解题过程和最终答案
const WORKING_SPLIT_CHARS: usize = 100;
/// 每道题/每个作答最多关联的图表数量
const MAX_DIAGRAMS: usize = 2;

/// 按分值标记切出的一段文本
#[derive(Debug)]
struct Segment {
    text: String,
    marks: f64,
    is_subpart: bool,
}

/// 归并后的一道题
#[derive(Debug)]
struct Group {
    segments: Vec<Segment>,
    total_marks: f64,
    has_subparts: bool,
}

impl Group {
    fn start(segment: Segment) -> Self {
        Self {
            total_marks: segment.marks,
            has_subparts: segment.is_subpart,
            segments: vec![segment],
        }
    }

    fn push(&mut self, segment: Segment) {
        self.total_marks += segment.marks;
        self.has_subparts |= segment.is_subpart;
        self.segments.push(segment);
    }

    fn text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// 结构分析服务
///
/// 职责：
/// - 抽取试卷元信息（课程代码、标题、日期、总分、时长）
/// - 按分值标记切分并归并题目
/// - 判断题型、抽取选择题选项
/// - 抽取学生信息并按题号匹配作答
pub struct StructureAnalyzer {
    course_code: Regex,
    titles: Vec<Regex>,
    dates: Vec<Regex>,
    total_marks: Regex,
    duration: Regex,
    marks_indicator: Regex,
    subpart_start: Regex,
    first_subpart: Regex,
    subpart_marker: Regex,
    numbered: Regex,
    topic_shift: Regex,
    option_marker: Regex,
    marks_in_text: Vec<Regex>,
    names: Vec<Regex>,
    ids: Vec<Regex>,
    email: Regex,
    question_boundary: Regex,
    numbered_boundary: Regex,
    answer_headers: [(Regex, Boundary); 3],
    answer_bare: Regex,
    final_answer: Regex,
}

/// 作答正文在哪种边界处结束
#[derive(Clone, Copy)]
enum Boundary {
    Question,
    Numbered,
}

impl Default for StructureAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

impl StructureAnalyzer {
    /// 创建新的结构分析服务（编译所有正则）
    pub fn new() -> Self {
        Self {
            course_code: re(r"(?i)([A-Z]{2,4}[-\s]?\d{3,4})"),
            titles: ["exam", "test", "quiz", "assignment"]
                .iter()
                .map(|kw| re(&format!(r"(?i)([^\n]*?{}[^\n]*?)\n", kw)))
                .collect(),
            dates: vec![
                re(r"\b(\d{1,2}[-/]\d{1,2}[-/]\d{2,4})\b"),
                re(r"\b([A-Z][a-z]+\s+\d{1,2},?\s+\d{4})\b"),
                re(r"\b(\d{4}[-/]\d{1,2}[-/]\d{1,2})\b"),
            ],
            total_marks: re(r"(?i)total\s*marks?\s*:?\s*(\d+)"),
            duration: re(r"(?i)duration\s*:?\s*(\d+\s*(?:hours?|mins?|minutes?))"),
            marks_indicator: re(r"(?i)\((\d+)\s*Marks?\)"),
            subpart_start: re(r"^\s*\(([a-z])\)"),
            first_subpart: re(r"^\s*\(a\)"),
            subpart_marker: re(r"(?m)^\s*\(([a-z])\)"),
            numbered: re(r"(?:^|\n)\s*(\d+)\.\s+"),
            topic_shift: re(r"(?i)(Show that|Prove that|Consider|Calculate|Find the)"),
            // 选项 "a)"，排除小问 "(a)"
            option_marker: re(r"(?i)(?:^|[^(\w])([a-e])\)"),
            marks_in_text: vec![
                re(r"(?i)\[(\d+)\s*(?:marks?|m)\]"),
                re(r"(?i)\((\d+)\s*(?:marks?|m)\)"),
                re(r"(?i)(\d+)\s*marks?"),
            ],
            names: vec![
                re(r"(?i:student\s+name)\s*:?\s*([A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+)+)"),
                re(r"(?i:name)\s*:?\s*([A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+)+)"),
            ],
            ids: vec![
                re(r"(?i)\b(?:student\s+)?id\b\s*:?\s*([A-Z0-9]+)"),
                re(r"(?i)roll\s+(?:no|number)\s*:?\s*([A-Z0-9]+)"),
            ],
            email: re(r"[\w.-]+@[\w.-]+\.\w+"),
            question_boundary: re(r"(?i)\n\s*(?:Q|Solution)\s*\.?\s*\d+"),
            numbered_boundary: re(r"\n\s*\d+\s*[_:.)\-]"),
            answer_headers: [
                (re(r"(?i)(?:^|\n)\s*Q\.?\s*(?P<num>\d+)\s*[:.)]?\s*"), Boundary::Question),
                (re(r"(?i)(?:^|\n)\s*Solution\s+(?P<num>\d+)\s*:\s*"), Boundary::Question),
                (re(r"(?:^|\n)\s*(?P<num>\d+)\s*[_:.)\-]\s*"), Boundary::Numbered),
            ],
            answer_bare: re(r"(?P<num>\d+)[:.)]?\s*"),
            final_answer: re(r"(?i)(?:final\s+)?answer\s*:?\s*([^\n]+)"),
        }
    }

    // ========== 试题卷 ==========

    /// 分析试题卷结构
    ///
    /// # 返回
    /// 返回 (元信息, 题目列表)
    pub fn analyze_question_paper(&self, pages: &[OcrPage]) -> (ExamMetadata, Vec<Question>) {
        info!("正在分析试题卷结构...");

        let full_text = join_pages(pages);
        let diagrams: Vec<Diagram> = pages.iter().flat_map(|p| p.diagrams.clone()).collect();

        let metadata = self.extract_metadata(&full_text);
        let questions = self.parse_questions(&full_text, &diagrams);

        info!("✓ 共找到 {} 道题", questions.len());
        (metadata, questions)
    }

    /// 分析答案卷结构
    ///
    /// 题目切分与试题卷相同；每题的标准答案按 `Solution N:` 等题号标记抽取
    pub fn analyze_solution_paper(&self, pages: &[OcrPage]) -> (ExamMetadata, Vec<Question>) {
        let (metadata, mut solutions) = self.analyze_question_paper(pages);

        let full_text = join_pages(pages);
        let numbers: Vec<String> = solutions.iter().map(|q| q.question_number.clone()).collect();
        let answers = self.parse_answers(&full_text, &[], &numbers, pages);

        for (question, answer) in solutions.iter_mut().zip(answers) {
            if !answer.is_blank() {
                question.correct_answer = Some(answer.answer_text);
            }
        }

        let with_answers = solutions.iter().filter(|q| q.has_correct_answer()).count();
        info!("✓ {}/{} 道题找到标准答案", with_answers, solutions.len());
        (metadata, solutions)
    }

    /// 抽取试卷元信息
    pub fn extract_metadata(&self, text: &str) -> ExamMetadata {
        let header = head(text, HEADER_SCAN_CHARS);

        ExamMetadata {
            course_code: first_capture(&self.course_code, text),
            exam_title: self
                .titles
                .iter()
                .find_map(|pattern| first_capture(pattern, header))
                .map(|t| t.trim().to_string()),
            date: self
                .dates
                .iter()
                .find_map(|pattern| first_capture(pattern, header)),
            total_marks: first_capture(&self.total_marks, text).and_then(|m| m.parse().ok()),
            duration: first_capture(&self.duration, text),
            instructions: None,
        }
    }

    /// 解析题目
    ///
    /// 以 `(N Marks)` 为界切段，再按以下规则归并为题目：
    /// 1. 段内有 `N. ` 编号 → 新题
    /// 2. 以 `(a)` 开头 → 当前题已有小问则为新题；否则上一段不是小问时为新题
    /// 3. 其余小问 `(b)`、`(c)` → 延续当前题
    /// 4. 无编号无小问 → 当前题有小问且本段 ≥3 分为新题；段首出现换题关键词也为新题
    pub fn parse_questions(&self, text: &str, diagrams: &[Diagram]) -> Vec<Question> {
        let segments = self.split_segments(text);
        if segments.is_empty() {
            warn!("⚠️ 没有找到分值标记");
            return Vec::new();
        }
        info!("找到 {} 个分值标记", segments.len());

        let groups = self.group_segments(segments);

        // 只取前两个图表中相关度高的
        let attached: Vec<Diagram> = diagrams
            .iter()
            .take(MAX_DIAGRAMS)
            .filter(|d| d.relevance == "high")
            .cloned()
            .collect();

        let questions: Vec<Question> = groups
            .iter()
            .enumerate()
            .map(|(idx, group)| self.build_question(idx + 1, group, &attached))
            .collect();

        let total: f64 = questions.iter().map(|q| q.marks).sum();
        info!("✓ 解析出 {} 道题，总分 {}", questions.len(), total);
        questions
    }

    fn split_segments(&self, text: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut start = 0;

        for caps in self.marks_indicator.captures_iter(text) {
            let (Some(whole), Some(value)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let segment_text = text[start..whole.end()].trim().to_string();
            start = whole.end();

            let marks = value.as_str().parse::<f64>().unwrap_or(0.0);
            let is_subpart = self.subpart_start.is_match(&segment_text);
            segments.push(Segment {
                text: segment_text,
                marks,
                is_subpart,
            });
        }

        segments
    }

    fn group_segments(&self, segments: Vec<Segment>) -> Vec<Group> {
        let mut groups = Vec::new();
        let mut current: Option<Group> = None;
        let mut last_was_subpart = false;

        for segment in segments {
            let start_new = if self.numbered.is_match(&segment.text) {
                true
            } else if segment.is_subpart {
                if self.first_subpart.is_match(&segment.text) {
                    match &current {
                        Some(group) if group.has_subparts => true,
                        Some(_) => !last_was_subpart,
                        None => true,
                    }
                } else {
                    false
                }
            } else {
                match &current {
                    Some(group) if group.has_subparts && segment.marks >= 3.0 => true,
                    Some(group) => {
                        !group.segments.is_empty()
                            && self
                                .topic_shift
                                .is_match(head(&segment.text, TOPIC_SCAN_CHARS))
                    }
                    None => false,
                }
            };

            last_was_subpart = segment.is_subpart;
            match current.as_mut() {
                Some(group) if !start_new => group.push(segment),
                _ => {
                    if let Some(done) = current.take() {
                        groups.push(done);
                    }
                    current = Some(Group::start(segment));
                }
            }
        }

        if let Some(done) = current {
            groups.push(done);
        }
        groups
    }

    fn build_question(&self, index: usize, group: &Group, diagrams: &[Diagram]) -> Question {
        let text = group.text();

        // 优先使用显式编号，否则按顺序编号
        let question_number = self
            .numbered
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .map(|n| n.to_string())
            .unwrap_or_else(|| index.to_string());

        let question_type = self.classify_question_type(&text);
        let options = if question_type == QuestionType::Mcq {
            self.extract_mcq_options(&text)
        } else {
            None
        };

        let mut sub_parts: Vec<String> = Vec::new();
        for caps in self.subpart_marker.captures_iter(&text) {
            let letter = caps[1].to_string();
            if !sub_parts.contains(&letter) {
                sub_parts.push(letter);
            }
        }

        debug!(
            "题目 {}: {} 分, 题型 {}, 小问 {:?}",
            question_number, group.total_marks, question_type, sub_parts
        );

        Question {
            question_number,
            sub_parts,
            marks: group.total_marks,
            question_type,
            question_text: text,
            options,
            has_diagram: !diagrams.is_empty(),
            diagram_path: diagrams.first().map(|d| d.image_path.clone()),
            diagrams: diagrams.to_vec(),
            correct_answer: None,
        }
    }

    /// 根据题干判断题型
    pub fn classify_question_type(&self, text: &str) -> QuestionType {
        let lower = text.to_lowercase();
        let has_any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        if self.option_marker.is_match(&lower) || has_any(&["choose", "select"]) {
            return QuestionType::Mcq;
        }
        if has_any(&["derive", "proof", "prove", "show that"]) {
            return QuestionType::Derivation;
        }
        if has_any(&["draw", "sketch", "diagram", "plot", "graph"]) {
            return QuestionType::Diagram;
        }
        if has_any(&["code", "program", "implement", "algorithm"]) {
            return QuestionType::Code;
        }
        if has_any(&["calculate", "compute", "find", "determine"]) {
            return QuestionType::Numerical;
        }
        if has_any(&["explain", "discuss", "describe", "compare"]) && text.chars().count() > 200 {
            return QuestionType::Essay;
        }
        QuestionType::ShortAnswer
    }

    /// 从题干中抽取分值，未标注时为 1 分
    pub fn extract_marks(&self, text: &str) -> f64 {
        self.marks_in_text
            .iter()
            .find_map(|pattern| first_capture(pattern, text))
            .and_then(|m| m.parse().ok())
            .unwrap_or(1.0)
    }

    /// 抽取选择题选项
    ///
    /// 选项内容截止到下一个选项标记或换行
    pub fn extract_mcq_options(&self, text: &str) -> Option<BTreeMap<String, String>> {
        let markers: Vec<(String, usize, usize)> = self
            .option_marker
            .captures_iter(text)
            .filter_map(|caps| {
                let letter = caps.get(1)?;
                let whole = caps.get(0)?;
                Some((letter.as_str().to_lowercase(), letter.start(), whole.end()))
            })
            .collect();

        let mut options = BTreeMap::new();
        for (i, (letter, _, body_start)) in markers.iter().enumerate() {
            let body_end = markers
                .get(i + 1)
                .map(|(_, next_start, _)| *next_start)
                .unwrap_or(text.len());
            let body = text[*body_start..body_end].trim_start();
            let line = body.split('\n').next().unwrap_or_default();
            let option = self.marks_indicator.replace_all(line, "");
            let option = option.trim();
            if !option.is_empty() {
                options.insert(letter.clone(), option.to_string());
            }
        }

        if options.is_empty() {
            None
        } else {
            Some(options)
        }
    }

    // ========== 学生答卷 ==========

    /// 分析学生答卷
    ///
    /// # 参数
    /// - `pages`: 各页 OCR 结果
    /// - `question_numbers`: 试题卷中的题号
    ///
    /// # 返回
    /// 返回 (学生信息, 每个题号一条作答)
    pub fn analyze_answer_sheet(
        &self,
        pages: &[OcrPage],
        question_numbers: &[String],
    ) -> (StudentInfo, Vec<Answer>) {
        info!("正在分析学生答卷结构...");

        let student_info = self.extract_student_info(pages.first().map_or("", |p| &p.text));
        let full_text = join_pages(pages);
        let diagrams: Vec<Diagram> = pages.iter().flat_map(|p| p.diagrams.clone()).collect();

        let answers = self.parse_answers(&full_text, &diagrams, question_numbers, pages);

        info!(
            "✓ 学生 {} 共找到 {} 条作答",
            student_info.display_name(),
            answers.len()
        );
        (student_info, answers)
    }

    /// 抽取学生信息（姓名、学号、邮箱）
    pub fn extract_student_info(&self, text: &str) -> StudentInfo {
        StudentInfo {
            name: self
                .names
                .iter()
                .find_map(|pattern| first_capture(pattern, text))
                .map(|n| n.trim().to_string()),
            id: self
                .ids
                .iter()
                .find_map(|pattern| first_capture(pattern, text))
                .map(|id| id.trim().to_string()),
            email: self.email.find(text).map(|m| m.as_str().to_string()),
        }
    }

    /// 按题号匹配学生作答
    ///
    /// 依次尝试 `Q1`、`Solution 1:`、`1.`/`1)`/`1_`，最后退化为题号首次出现的位置
    pub fn parse_answers(
        &self,
        text: &str,
        diagrams: &[Diagram],
        question_numbers: &[String],
        pages: &[OcrPage],
    ) -> Vec<Answer> {
        let avg_confidence = if pages.is_empty() {
            0.5
        } else {
            pages.iter().map(|p| p.confidence).sum::<f64>() / pages.len() as f64
        };
        let quality = handwriting_quality(avg_confidence);
        let attached: Vec<Diagram> = diagrams.iter().take(MAX_DIAGRAMS).cloned().collect();

        question_numbers
            .iter()
            .map(|q_num| match self.find_answer_body(text, q_num) {
                Some(body) => {
                    let (answer_text, working) = self.split_working(body.trim());
                    Answer {
                        question_number: q_num.clone(),
                        answer_text,
                        working,
                        has_diagram: !attached.is_empty(),
                        diagram_path: attached.first().map(|d| d.image_path.clone()),
                        diagrams: attached.clone(),
                        ocr_confidence: avg_confidence,
                        handwriting_quality: quality.to_string(),
                    }
                }
                None => {
                    debug!("题目 {} 没有找到作答", q_num);
                    Answer {
                        question_number: q_num.clone(),
                        answer_text: NO_ANSWER_PLACEHOLDER.to_string(),
                        working: None,
                        has_diagram: false,
                        diagram_path: None,
                        diagrams: Vec::new(),
                        ocr_confidence: avg_confidence,
                        handwriting_quality: "unknown".to_string(),
                    }
                }
            })
            .collect()
    }

    fn find_answer_body<'t>(&self, text: &'t str, q_num: &str) -> Option<&'t str> {
        for (header, boundary) in &self.answer_headers {
            if let Some(body_start) = find_header(header, text, q_num) {
                return Some(body_until(text, body_start, self.boundary(*boundary)));
            }
        }

        // 兜底：题号首次单独出现的位置
        find_header(&self.answer_bare, text, q_num)
            .map(|body_start| body_until(text, body_start, &self.question_boundary))
    }

    fn boundary(&self, boundary: Boundary) -> &Regex {
        match boundary {
            Boundary::Question => &self.question_boundary,
            Boundary::Numbered => &self.numbered_boundary,
        }
    }

    /// 较长作答中按 "Answer:" 拆出解题过程和最终答案
    fn split_working(&self, body: &str) -> (String, Option<String>) {
        if body.chars().count() <= WORKING_SPLIT_CHARS {
            return (body.to_string(), None);
        }
        match self.final_answer.captures(body) {
            Some(caps) => {
                let (Some(whole), Some(answer)) = (caps.get(0), caps.get(1)) else {
                    return (body.to_string(), None);
                };
                let working = body[..whole.start()].trim();
                let working = (!working.is_empty()).then(|| working.to_string());
                (answer.as_str().trim().to_string(), working)
            }
            None => (body.to_string(), None),
        }
    }
}

/// 查找题号为 `q_num` 的标题，返回正文起点
///
/// 题号前后都不能紧挨数字，避免 `Q1` 误中 `Q10`
fn find_header(header: &Regex, text: &str, q_num: &str) -> Option<usize> {
    let mut pos = 0;
    while let Some(caps) = header.captures_at(text, pos) {
        let num = caps.name("num")?;
        let prev_is_digit = text[..num.start()]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_digit());
        let next_is_digit = text[num.end()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit());
        if num.as_str() == q_num && !prev_is_digit && !next_is_digit {
            return caps.get(0).map(|m| m.end());
        }
        pos = num.end();
    }
    None
}

fn body_until<'t>(text: &'t str, body_start: usize, boundary: &Regex) -> &'t str {
    let end = boundary
        .find_at(text, body_start)
        .map(|m| m.start())
        .unwrap_or(text.len());
    &text[body_start..end.max(body_start)]
}

fn handwriting_quality(confidence: f64) -> &'static str {
    if confidence < 0.6 {
        "poor"
    } else if confidence < 0.75 {
        "fair"
    } else {
        "good"
    }
}

fn join_pages(pages: &[OcrPage]) -> String {
    pages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// 取前 n 个字符（按字符边界）
fn head(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn first_capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
