//! # 统一错误处理模块
//!
//! 定义 slurm-launcher 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 错误分类
//! - 配置错误：互斥选项、缺失数组名、输入长度不一致（提交前同步抛出）
//! - 存储/脚本写入错误：在提交前中止整个批次
//! - 外部命令错误：仅在提交客户端内部使用，引擎会把它们归一化为 FAILED 结果
//! - 任务查找错误：运行时由 `lookup` 子命令报告
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// slurm-launcher 统一错误类型
#[derive(Error, Debug)]
pub enum LauncherError {
    // ─────────────────────────────────────────────────────────────
    // 配置错误
    // ─────────────────────────────────────────────────────────────
    #[error("Cannot specify both '{first}' and '{second}'")]
    ConflictingOptions { first: String, second: String },

    #[error("Array submission requires 'job_array_name' to be set")]
    MissingArrayName,

    #[error(
        "Task lists differ in length: {overrides} override sets, {job_names} job names, {output_dirs} output dirs"
    )]
    LengthMismatch {
        overrides: usize,
        job_names: usize,
        output_dirs: usize,
    },

    #[error("Invalid task {index}: {reason}")]
    InvalidTask { index: usize, reason: String },

    #[error("Failed to parse config file: {path}\nReason: {reason}")]
    ConfigParseError { path: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory: {path}")]
    DirectoryCreateError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 任务描述存储错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to write task store: {path}")]
    StoreWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed task store: {path}\nReason: {reason}")]
    StoreParseError { path: String, reason: String },

    #[error("Task {index} not found (store holds {size} tasks)")]
    TaskNotFound { index: usize, size: usize },

    // ─────────────────────────────────────────────────────────────
    // 外部命令错误
    // ─────────────────────────────────────────────────────────────
    #[error("External command '{command}' not found in PATH")]
    CommandNotFound { command: String },

    #[error("External command failed: {command}\n{stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("External command '{command}' timed out after {secs}s")]
    CommandTimeout { command: String, secs: u64 },

    #[error("Failed to run external command '{command}'")]
    CommandIo {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────
    // CSV 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl LauncherError {
    /// 是否为提交前即可检测的配置错误
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LauncherError::ConflictingOptions { .. }
                | LauncherError::MissingArrayName
                | LauncherError::LengthMismatch { .. }
                | LauncherError::InvalidTask { .. }
                | LauncherError::ConfigParseError { .. }
        )
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, LauncherError>;
