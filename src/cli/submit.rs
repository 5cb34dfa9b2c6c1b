//! # submit 子命令 CLI 定义
//!
//! 批量提交任务到 Slurm
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/submit.rs`

use clap::Args;
use std::path::PathBuf;

/// submit 子命令参数
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Launcher config file (YAML)
    #[arg(long, short)]
    pub config: PathBuf,

    /// CSV file with columns job_name,output_dir,overrides
    #[arg(long)]
    pub tasks: PathBuf,

    /// Directory for the array script and task store
    #[arg(long, default_value = "sweep")]
    pub batch_dir: PathBuf,

    // ─────────────────────────────────────────────────────────────
    // Config overrides
    // ─────────────────────────────────────────────────────────────
    /// Submit as a job array with this name
    #[arg(long)]
    pub array_name: Option<String>,

    /// Slurm partition
    #[arg(long)]
    pub partition: Option<String>,

    /// Task entry point command
    #[arg(long)]
    pub entry_point: Option<String>,

    /// Scheduler submit program
    #[arg(long, env = "SLURM_LAUNCHER_SBATCH")]
    pub sbatch: Option<String>,

    /// Submission timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    // ─────────────────────────────────────────────────────────────
    // Execution control
    // ─────────────────────────────────────────────────────────────
    /// Only generate scripts and task store, do not submit
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}
