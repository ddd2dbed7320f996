//! 外部流水线命令 - 编排层
//!
//! 每个函数对应一个子命令，返回进程退出码

use crate::config::Config;
use crate::services::{
    check_results, confirm, discover_inputs, CheckOutcome, DiscoveredInputs, Monitor,
    MonitorOutcome, PipelineInvocation,
};
use crate::utils::logging::log_banner;
use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use tracing::{error, info, warn};

/// 启动流水线
///
/// 准备目录后执行 `PIPELINE_COMMAND`，输出逐行追加到运行日志
pub async fn bootstrap(config: &Config, passthrough: &[String]) -> Result<i32> {
    config.ensure_dirs().context("无法创建输出或日志目录")?;
    log_runtime_config(config);

    let invocation = PipelineInvocation::new(config, passthrough)?;
    let code = invocation.execute_logged(&config.run_log_file).await?;
    report_exit(code);
    Ok(code)
}

/// 扫描输入目录并列出分类结果
pub fn discover(config: &Config) -> Result<DiscoveredInputs> {
    let inputs = discover_inputs(&config.input_dir)?;

    println!("试题卷: {}", inputs.question.display());
    match &inputs.solution {
        Some(solution) => println!("答案卷: {}", solution.display()),
        None => println!("答案卷: (无)"),
    }
    for (idx, answer) in inputs.answers.iter().enumerate() {
        println!("学生答卷 {}: {}", idx + 1, answer.display());
    }
    Ok(inputs)
}

/// 发现 PDF 后组装命令，确认后执行
///
/// `assume_yes` 为 true 时跳过确认；确认从 `reader` 读取，提示写到 `writer`
pub async fn dispatch<R: BufRead, W: Write>(
    config: &Config,
    assume_yes: bool,
    reader: &mut R,
    writer: &mut W,
) -> Result<i32> {
    let inputs = discover(config)?;
    let invocation = PipelineInvocation::from_inputs(config, &inputs)?;

    writeln!(writer, "\n将执行: {}", invocation.display())?;

    if !assume_yes && !confirm(reader, writer)? {
        info!("已取消");
        return Ok(0);
    }

    let code = invocation.execute().await?;
    report_exit(code);
    Ok(code)
}

/// 等待评分报告出现
pub async fn monitor(config: &Config) -> Result<i32> {
    match Monitor::from_config(config).run().await? {
        MonitorOutcome::Completed(_) => {
            info!("可运行 check 子命令查看结果");
            Ok(0)
        }
        MonitorOutcome::TimedOut { .. } => {
            warn!("⏰ 停止监控，可稍后运行 check 子命令查看日志");
            Ok(1)
        }
    }
}

/// 查看最新结果
pub async fn check(config: &Config) -> Result<i32> {
    let outcome = check_results(
        &config.output_dir,
        &config.run_log_file,
        &config.logs_dir,
        config.log_tail_lines,
    )
    .await?;

    match &outcome {
        CheckOutcome::Report { path, report } => {
            log_banner(&format!("评分报告: {}", path.display()));
            let pretty = serde_json::to_string_pretty(report).context("无法格式化评分报告")?;
            println!("{}", pretty);
            println!();
            for line in report.summary_lines(true) {
                println!("{}", line);
            }
        }
        CheckOutcome::LogTail { path, lines } => {
            warn!("还没有评分报告，运行日志 {} 的最后 {} 行:", path.display(), lines.len());
            for line in lines {
                println!("{}", line);
            }
        }
        CheckOutcome::Nothing => {
            error!(
                "没有找到评分报告，也没有运行日志（{} / {}）",
                config.output_dir.display(),
                config.run_log_file.display()
            );
        }
    }
    Ok(outcome.exit_code())
}

fn log_runtime_config(config: &Config) {
    log_banner("运行配置");
    info!("输入目录: {}", config.input_dir.display());
    info!("输出目录: {}", config.output_dir.display());
    info!("日志目录: {}", config.logs_dir.display());
    info!("运行日志: {}", config.run_log_file.display());
    info!("流水线命令: {}", config.pipeline_command);
    info!("部分得分: {}", if config.enable_partial_credit { "启用" } else { "关闭" });
    info!("语义相似度阈值: {:.2}", config.semantic_similarity_threshold);
    info!("{}", "=".repeat(60));
}

fn report_exit(code: i32) {
    info!("{}", "=".repeat(60));
    if code == 0 {
        info!("✅ 流水线执行成功");
    } else {
        error!("❌ 流水线执行失败，退出码 {}", code);
    }
    info!("{}", "=".repeat(60));
}
