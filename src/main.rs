//! # slurm-launcher - Slurm 批量作业提交工具
//!
//! 把一批参数化任务提交到 Slurm，可逐个提交或打包为作业数组。
//!
//! ## 子命令
//! - `submit`     - 批量提交任务
//! - `lookup`     - 数组成员运行时读取自己的任务参数
//! - `directives` - 列出脚本中的 `#SBATCH` 指令
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   └── commands/   (命令执行逻辑)
//!         └── slurm_launcher (库：batch/, config, models/, utils/)
//! ```

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use slurm_launcher::utils::output;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = commands::run(cli.command) {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
