//! # 工具函数模块
//!
//! 提供美化输出、进度提示、shell 转义与 Slurm 脚本生成等工具。
//!
//! ## 依赖关系
//! - 被 `batch/` 与 `commands/` 模块使用
//! - 子模块: output, progress, shell, slurm

pub mod output;
pub mod progress;
pub mod shell;
pub mod slurm;
