//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `submit`: 批量提交任务（单作业或作业数组）
//! - `lookup`: 数组成员运行时按序号读取任务参数
//! - `directives`: 列出脚本中的 `#SBATCH` 指令
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: submit, lookup, directives

pub mod directives;
pub mod lookup;
pub mod submit;

use clap::{ArgAction, Parser, Subcommand};

/// slurm-launcher - Slurm 批量作业提交工具
#[derive(Parser)]
#[command(name = "slurm-launcher")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Submit parameterized task batches to Slurm", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Submit a batch of tasks to Slurm as individual jobs or one job array
    Submit(submit::SubmitArgs),

    /// Print the overrides, job name and output dir of one array task
    Lookup(lookup::LookupArgs),

    /// List the #SBATCH directives of a submission script
    Directives(directives::DirectivesArgs),
}
