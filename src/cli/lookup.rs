//! # lookup 子命令 CLI 定义
//!
//! 由生成的数组脚本在计算节点上调用
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/lookup.rs`

use clap::Args;
use std::path::PathBuf;

/// lookup 子命令参数
#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Task store written at submission time
    pub store: PathBuf,

    /// Zero-based task index (SLURM_ARRAY_TASK_ID)
    pub index: usize,
}
