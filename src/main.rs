use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use exam_grader::orchestrator::pipeline;
use exam_grader::services::UnavailableAiGrader;
use exam_grader::utils::logger;
use exam_grader::{AnalysisFlow, App, Config};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "exam_grader")]
#[command(about = "试卷评分流水线：发现 PDF、调度、监控、结构分析与评分")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// .env 配置文件路径
    #[arg(long, default_value = ".env", global = true)]
    env_file: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// 加载 .env 并启动流水线，输出写入运行日志
    Run {
        /// 原样传给流水线的参数
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// 列出输入目录中识别出的 PDF
    Discover,

    /// 发现 PDF 后组装命令并执行
    Dispatch {
        /// 跳过确认
        #[arg(short, long)]
        yes: bool,
    },

    /// 等待评分报告出现
    Monitor,

    /// 查看最新的评分报告或运行日志
    Check,

    /// 分析试题卷（或答案卷）的 OCR 转写
    AnalyzePaper {
        /// 转写文件（.txt 或 OCR 页面 JSON）
        #[arg(required = true)]
        transcripts: Vec<PathBuf>,

        /// 作为答案卷分析
        #[arg(long)]
        solution: bool,

        /// 输出目录（默认使用 OUTPUT_DIR）
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// 分析学生答卷的 OCR 转写
    AnalyzeAnswers {
        #[arg(required = true)]
        transcripts: Vec<PathBuf>,

        /// 试题卷 JSON
        #[arg(long)]
        question_paper: PathBuf,

        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// 批量评分答卷 JSON
    Grade {
        #[arg(long)]
        question_paper: PathBuf,

        #[arg(long)]
        solution_paper: Option<PathBuf>,

        /// answer_sheet_*.json
        #[arg(required = true)]
        sheets: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            // 日志可能尚未初始化
            eprintln!("❌ {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    let config = load_config(&cli)?;

    let code = match cli.command {
        Commands::Run { args } => {
            logger::init_with_file(&config.log_level, &config.logs_dir)?;
            pipeline::bootstrap(&config, &args).await
        }
        Commands::Discover => {
            logger::init(&config.log_level);
            pipeline::discover(&config)?;
            Ok(0)
        }
        Commands::Dispatch { yes } => {
            logger::init(&config.log_level);
            pipeline::dispatch(
                &config,
                yes,
                &mut std::io::stdin().lock(),
                &mut std::io::stdout(),
            )
            .await
        }
        Commands::Monitor => {
            logger::init(&config.log_level);
            pipeline::monitor(&config).await
        }
        Commands::Check => {
            logger::init(&config.log_level);
            pipeline::check(&config).await
        }
        Commands::AnalyzePaper {
            transcripts,
            solution,
            output_dir,
        } => {
            logger::init(&config.log_level);
            let flow = AnalysisFlow::new(output_dir.unwrap_or_else(|| config.output_dir.clone()));
            let path = flow.analyze_paper(&transcripts, solution).await?;
            info!("已写出: {}", path.display());
            Ok(0)
        }
        Commands::AnalyzeAnswers {
            transcripts,
            question_paper,
            output_dir,
        } => {
            logger::init(&config.log_level);
            let flow = AnalysisFlow::new(output_dir.unwrap_or_else(|| config.output_dir.clone()));
            let path = flow.analyze_answers(&transcripts, &question_paper).await?;
            info!("已写出: {}", path.display());
            Ok(0)
        }
        Commands::Grade {
            question_paper,
            solution_paper,
            sheets,
        } => {
            logger::init_with_file(&config.log_level, &config.logs_dir)?;
            config.ensure_dirs().context("无法创建输出或日志目录")?;
            warn!("未配置 AI 评分服务，需要 AI 判断的题目将记 0 分并在反馈中注明");

            let app = App::new(config, Arc::new(UnavailableAiGrader));
            let stats = app
                .run(&question_paper, solution_paper.as_deref(), &sheets)
                .await?;
            Ok(if stats.failed == 0 { 0 } else { 1 })
        }
    }?;
    Ok(code)
}

/// `run` 必须有 .env；其他命令有则加载，没有就只读环境变量
fn load_config(cli: &Cli) -> Result<Config> {
    let require_env = matches!(cli.command, Commands::Run { .. });
    if require_env || cli.env_file.is_file() {
        return Ok(Config::load(&cli.env_file)?);
    }
    Ok(Config::from_env())
}
