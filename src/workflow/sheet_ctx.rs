//! 答卷处理上下文
//!
//! 封装"我正在处理第几份答卷、是哪个学生"这一信息

use std::fmt::Display;

/// 答卷处理上下文
#[derive(Debug, Clone)]
pub struct SheetCtx {
    /// 答卷索引（从1开始，仅用于日志显示）
    pub sheet_index: usize,

    /// 学号，没有时为 "unknown"
    pub student_id: String,
}

impl SheetCtx {
    /// 创建新的答卷上下文
    pub fn new(sheet_index: usize, student_id: impl Into<String>) -> Self {
        Self {
            sheet_index,
            student_id: student_id.into(),
        }
    }
}

impl Display for SheetCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[答卷 {} 学号#{}]", self.sheet_index, self.student_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(SheetCtx::new(2, "S9").to_string(), "[答卷 2 学号#S9]");
    }
}
