//! # 任务描述数据模型
//!
//! 批次中每个任务的参数集合：覆盖参数、作业名、输出目录。
//!
//! ## 依赖关系
//! - 被 `batch/store.rs`, `batch/launcher.rs` 使用
//! - 使用 `utils/shell.rs` 进行参数转义

use crate::utils::shell;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 启动器内部覆盖参数的前缀，不会传递给任务本身
pub const INTERNAL_OVERRIDE_PREFIX: &str = "hydra.";

/// 单个任务的描述，写入存储后不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDescriptor {
    /// 批次内从 0 开始的任务序号
    pub task_index: usize,
    /// 有序的 `key=value` 覆盖参数
    pub overrides: Vec<String>,
    /// 显示用作业名
    pub job_name: String,
    /// 输出目录
    pub output_dir: PathBuf,
}

impl TaskDescriptor {
    pub fn new(
        task_index: usize,
        overrides: Vec<String>,
        job_name: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        TaskDescriptor {
            task_index,
            overrides,
            job_name: job_name.into(),
            output_dir: output_dir.into(),
        }
    }

    /// 过滤掉启动器内部参数后的覆盖列表
    pub fn task_overrides(&self) -> Vec<&str> {
        filter_overrides(&self.overrides)
    }

    /// 转义后以空格连接的覆盖参数，可直接拼接进 shell 命令
    pub fn quoted_overrides(&self) -> String {
        self.task_overrides()
            .into_iter()
            .map(shell::quote)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// 转为存储记录
    pub fn to_record(&self) -> TaskRecord {
        TaskRecord {
            overrides: self.quoted_overrides(),
            job_name: self.job_name.clone(),
            output_dir: self.output_dir.display().to_string(),
            task_id: self.task_index,
        }
    }
}

/// 存储文件中的单条记录（外部进程可读）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub overrides: String,
    pub job_name: String,
    pub output_dir: String,
    pub task_id: usize,
}

/// 去掉启动器内部覆盖参数
pub fn filter_overrides(overrides: &[String]) -> Vec<&str> {
    overrides
        .iter()
        .map(String::as_str)
        .filter(|o| !o.starts_with(INTERNAL_OVERRIDE_PREFIX))
        .collect()
}
