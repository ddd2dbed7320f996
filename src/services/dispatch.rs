//! 流水线调度服务 - 业务能力层
//!
//! 组装流水线命令行、交互确认、启动子进程

use crate::config::Config;
use crate::error::DispatchError;
use crate::models::paper_kind::PaperKind;
use crate::services::discovery::DiscoveredInputs;
use std::io::{BufRead, Write};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// 一次流水线调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl PipelineInvocation {
    /// 由配置中的流水线命令和额外参数组装
    pub fn new(config: &Config, extra_args: &[String]) -> Result<Self, DispatchError> {
        let (program, mut args) = config.pipeline_program()?;
        args.extend(extra_args.iter().cloned());
        Ok(Self { program, args })
    }

    /// 由发现结果组装：`--question <q> [--solution <s>] --answers <a>...`
    pub fn from_inputs(config: &Config, inputs: &DiscoveredInputs) -> Result<Self, DispatchError> {
        let mut extra = vec![
            PaperKind::Question.flag().to_string(),
            inputs.question.display().to_string(),
        ];
        if let Some(solution) = &inputs.solution {
            extra.push(PaperKind::Solution.flag().to_string());
            extra.push(solution.display().to_string());
        }
        for answer in &inputs.answers {
            extra.push(PaperKind::Answer.flag().to_string());
            extra.push(answer.display().to_string());
        }
        Self::new(config, &extra)
    }

    /// 用于展示的命令行，含空白的参数加引号
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|arg| shell_quote(arg))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// 执行并继承标准输入输出，返回退出码
    pub async fn execute(&self) -> Result<i32, DispatchError> {
        info!("▶ 执行: {}", self.display());
        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .await
            .map_err(|source| DispatchError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        Ok(exit_code(status))
    }

    /// 执行并把每行 stdout/stderr 追加到日志文件，同时回显到控制台
    pub async fn execute_logged(&self, log_file: &Path) -> Result<i32, DispatchError> {
        info!("▶ 执行: {}", self.display());
        info!("输出同时写入: {}", log_file.display());

        let mut log = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .await
            .map_err(|source| DispatchError::RunLog {
                path: log_file.to_path_buf(),
                source,
            })?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| DispatchError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let (tx, mut rx) = mpsc::unbounded_channel::<(bool, String)>();
        let stdout_task = child
            .stdout
            .take()
            .map(|out| tokio::spawn(forward_lines(out, false, tx.clone())));
        let stderr_task = child
            .stderr
            .take()
            .map(|err| tokio::spawn(forward_lines(err, true, tx.clone())));
        drop(tx);

        let mut log_failed = false;
        while let Some((is_stderr, line)) = rx.recv().await {
            if is_stderr {
                eprintln!("{}", line);
            } else {
                println!("{}", line);
            }
            if log_failed {
                continue;
            }
            if let Err(e) = log.write_all(format!("{}\n", line).as_bytes()).await {
                warn!("⚠️ 写入运行日志 {} 失败，之后的输出不再记录: {}", log_file.display(), e);
                log_failed = true;
            }
        }
        if !log_failed {
            if let Err(e) = log.flush().await {
                warn!("⚠️ 刷新运行日志 {} 失败: {}", log_file.display(), e);
            }
        }

        for task in [stdout_task, stderr_task].into_iter().flatten() {
            let _ = task.await;
        }

        let status = child.wait().await.map_err(|source| DispatchError::Wait {
            program: self.program.clone(),
            source,
        })?;
        Ok(exit_code(status))
    }
}

async fn forward_lines<R: AsyncRead + Unpin>(
    stream: R,
    is_stderr: bool,
    tx: mpsc::UnboundedSender<(bool, String)>,
) {
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send((is_stderr, line)).is_err() {
            break;
        }
    }
}

/// 被信号终止时记为 1
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

fn shell_quote(arg: &str) -> String {
    if arg.is_empty() || arg.chars().any(char::is_whitespace) {
        format!("'{}'", arg.replace('\'', r"'\''"))
    } else {
        arg.to_string()
    }
}

/// 询问是否继续
///
/// 只有 `y` / `yes`（不区分大小写）视为确认；其余输入或 EOF 视为取消
pub fn confirm<R: BufRead, W: Write>(reader: &mut R, writer: &mut W) -> Result<bool, DispatchError> {
    write!(writer, "继续执行? [y/N] ").map_err(DispatchError::Prompt)?;
    writer.flush().map_err(DispatchError::Prompt)?;

    let mut line = String::new();
    let read = reader.read_line(&mut line).map_err(DispatchError::Prompt)?;
    if read == 0 {
        return Ok(false);
    }
    let answer = line.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}
