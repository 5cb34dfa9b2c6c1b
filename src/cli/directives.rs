//! # directives 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/directives.rs`

use clap::Args;
use std::path::PathBuf;

/// directives 子命令参数
#[derive(Args, Debug)]
pub struct DirectivesArgs {
    /// Submission script to inspect
    pub script: PathBuf,
}
