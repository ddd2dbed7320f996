//! 警告写入服务 - 业务能力层
//!
//! 只负责"写 warn.txt"能力，不关心流程

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::utils::truncate_text;

/// 警告写入服务
///
/// 职责：
/// - 把无法评分的作答（题号在试题卷中不存在）追加到 warn.txt
/// - 只处理单条作答
pub struct WarnWriter {
    warn_file_path: PathBuf,
}

impl WarnWriter {
    /// 在输出目录下创建 warn.txt 写入服务
    pub fn new(output_dir: &Path) -> Self {
        Self {
            warn_file_path: output_dir.join("warn.txt"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.warn_file_path
    }

    /// 写入警告信息
    ///
    /// # 参数
    /// - `student_id`: 学号
    /// - `question_number`: 作答上的题号
    /// - `answer_text`: 作答内容
    pub fn write(&self, student_id: &str, question_number: &str, answer_text: &str) -> Result<()> {
        debug!(
            "写入警告: 学生 {} | 题目 {} | 作答长度: {}",
            student_id,
            question_number,
            answer_text.len()
        );

        if let Some(parent) = self.warn_file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.warn_file_path)
            .with_context(|| format!("无法打开 {}", self.warn_file_path.display()))?;

        let warn_msg = format!(
            "学生 {} | 题目 {} 不在试题卷中 | 作答: {}\n",
            student_id,
            question_number,
            truncate_text(&answer_text.replace('\n', " "), 200)
        );
        file.write_all(warn_msg.as_bytes())?;

        Ok(())
    }
}
