//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/` 与库中的 `batch/`, `utils/`
//! - 子模块: submit, lookup, directives

pub mod directives;
pub mod lookup;
pub mod submit;

use crate::cli::Commands;

/// 执行命令
pub fn run(cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Submit(args) => submit::execute(args),
        Commands::Lookup(args) => lookup::execute(args),
        Commands::Directives(args) => directives::execute(args),
    }
}
