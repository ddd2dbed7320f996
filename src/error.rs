use std::path::PathBuf;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 输入发现错误
    #[error("输入发现错误: {0}")]
    Discovery(#[from] DiscoveryError),
    /// 流水线调度错误
    #[error("调度错误: {0}")]
    Dispatch(#[from] DispatchError),
    /// 结构分析错误
    #[error("结构分析错误: {0}")]
    Analysis(#[from] AnalysisError),
    /// 评分错误
    #[error("评分错误: {0}")]
    Grading(#[from] GradingError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// .env 文件不存在
    #[error(".env 文件不存在: {}，请先根据模板创建", path.display())]
    EnvFileMissing { path: PathBuf },
    /// .env 文件解析失败
    #[error("无法加载 .env 文件 ({}): {source}", path.display())]
    EnvFileInvalid {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 流水线命令为空
    #[error("PIPELINE_COMMAND 不能为空")]
    EmptyPipelineCommand,
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {}", path.display())]
    NotFound { path: PathBuf },
    /// 读取文件失败
    #[error("读取文件失败 ({}): {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({}): {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// JSON 解析失败
    #[error("JSON解析失败 ({}): {source}", path.display())]
    JsonParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// 输入发现错误
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// 输入目录不存在，已自动创建
    #[error("输入目录不存在，已创建: {}，请将 PDF 放入该目录后重试", path.display())]
    InputDirCreated { path: PathBuf },
    /// 没有找到符合命名规则的 PDF
    #[error("在 {} 中没有找到符合命名规则的 PDF\n{hint}", dir.display())]
    NoMatchingPdfs { dir: PathBuf, hint: String },
    /// 缺少试题卷
    #[error("没有找到试题卷 PDF（文件名需包含 question / paper / exam 等关键字）")]
    MissingQuestionPaper,
    /// 缺少答题卡
    #[error("没有找到学生答卷 PDF（文件名需包含 answer / student / response 等关键字）")]
    MissingAnswerSheets,
    /// 读取目录失败
    #[error("无法读取目录 {}: {source}", dir.display())]
    ReadDirFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 流水线调度错误
#[derive(Debug, Error)]
pub enum DispatchError {
    /// 启动进程失败
    #[error("无法启动进程 {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// 等待进程失败
    #[error("等待进程 {program} 结束失败: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// 确认交互失败
    #[error("读取确认输入失败: {0}")]
    Prompt(#[source] std::io::Error),
    /// 无法打开运行日志
    #[error("无法打开运行日志 {}: {source}", path.display())]
    RunLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 流水线命令配置有误
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// 结构分析错误
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// 没有可分析的页面
    #[error("没有可分析的 OCR 页面")]
    NoPages,
    /// 试题卷中没有题目
    #[error("试题卷中没有解析出任何题目: {}", path.display())]
    NoQuestions { path: PathBuf },
}

/// 评分错误
#[derive(Debug, Error)]
pub enum GradingError {
    /// AI 评分不可用
    #[error("AI 评分服务不可用")]
    AiUnavailable,
    /// 图像文件缺失
    #[error("图像文件缺失: {}", path.display())]
    DiagramMissing { path: PathBuf },
}

// ========== 便捷构造函数 ==========

impl FileError {
    /// 创建文件读取错误
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            return FileError::NotFound { path: path.into() };
        }
        FileError::ReadFailed {
            path: path.into(),
            source,
        }
    }

    /// 创建文件写入错误
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FileError::WriteFailed {
            path: path.into(),
            source,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
