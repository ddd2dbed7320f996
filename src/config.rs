use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 待处理 PDF 存放目录
    pub input_dir: PathBuf,
    /// JSON 产物输出目录
    pub output_dir: PathBuf,
    /// 日志目录
    pub logs_dir: PathBuf,
    /// 流水线运行日志（监控时读取末尾）
    pub run_log_file: PathBuf,
    /// 流水线入口命令
    pub pipeline_command: String,
    // --- 监控配置 ---
    pub poll_interval_secs: u64,
    pub max_checks: u32,
    pub log_tail_lines: usize,
    /// 同时评分的答卷数量
    pub max_concurrent_sheets: usize,
    // --- 评分配置 ---
    pub enable_partial_credit: bool,
    pub semantic_similarity_threshold: f64,
    pub input_token_cost: f64,
    pub output_token_cost: f64,
    /// 是否显示详细日志
    pub verbose: bool,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/input"),
            output_dir: PathBuf::from("data/output"),
            logs_dir: PathBuf::from("logs"),
            run_log_file: PathBuf::from("full_run.log"),
            pipeline_command: "python main.py".to_string(),
            poll_interval_secs: 30,
            max_checks: 60,
            log_tail_lines: 5,
            max_concurrent_sheets: 4,
            enable_partial_credit: true,
            semantic_similarity_threshold: 0.80,
            input_token_cost: 3.0 / 1_000_000.0,
            output_token_cost: 15.0 / 1_000_000.0,
            verbose: true,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// 从环境变量读取配置，缺失的字段使用默认值
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            input_dir: env_or("INPUT_DIR", default.input_dir),
            output_dir: env_or("OUTPUT_DIR", default.output_dir),
            logs_dir: env_or("LOGS_DIR", default.logs_dir),
            run_log_file: env_or("RUN_LOG_FILE", default.run_log_file),
            pipeline_command: std::env::var("PIPELINE_COMMAND").unwrap_or(default.pipeline_command),
            poll_interval_secs: env_or("POLL_INTERVAL_SECS", default.poll_interval_secs),
            max_checks: env_or("MAX_CHECKS", default.max_checks),
            log_tail_lines: env_or("LOG_TAIL_LINES", default.log_tail_lines),
            max_concurrent_sheets: env_or("MAX_CONCURRENT_SHEETS", default.max_concurrent_sheets).max(1),
            enable_partial_credit: env_or("ENABLE_PARTIAL_CREDIT", default.enable_partial_credit),
            semantic_similarity_threshold: env_or("SEMANTIC_SIMILARITY_THRESHOLD", default.semantic_similarity_threshold),
            input_token_cost: env_or("INPUT_TOKEN_COST", default.input_token_cost),
            output_token_cost: env_or("OUTPUT_TOKEN_COST", default.output_token_cost),
            verbose: env_or("VERBOSE", default.verbose),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(default.log_level),
        }
    }

    /// 加载 .env 后读取配置
    ///
    /// .env 不存在时直接报错，不回退到默认值
    pub fn load(env_file: &Path) -> Result<Self, ConfigError> {
        if !env_file.is_file() {
            return Err(ConfigError::EnvFileMissing {
                path: env_file.to_path_buf(),
            });
        }
        dotenvy::from_path(env_file).map_err(|source| ConfigError::EnvFileInvalid {
            path: env_file.to_path_buf(),
            source,
        })?;
        Ok(Self::from_env())
    }

    /// 监控轮询间隔
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// 拆分流水线命令为 (程序, 参数)
    pub fn pipeline_program(&self) -> Result<(String, Vec<String>), ConfigError> {
        let mut parts = self.pipeline_command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(ConfigError::EmptyPipelineCommand)?;
        Ok((program, parts.collect()))
    }

    /// 创建输出目录和日志目录
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;
        std::fs::create_dir_all(&self.logs_dir)?;
        Ok(())
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(value) => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!(
                    "{}",
                    ConfigError::EnvVarParseFailed {
                        var_name: name.to_string(),
                        value,
                        expected_type: std::any::type_name::<T>().to_string(),
                    }
                );
                default
            }
        },
        Err(_) => default,
    }
}
