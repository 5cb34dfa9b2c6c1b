//! # directives 命令实现
//!
//! 解析提交脚本中的 `#SBATCH` 指令并以表格打印。
//!
//! ## 依赖关系
//! - 使用 `cli/directives.rs` 定义的参数
//! - 使用 `utils/slurm.rs`, `utils/output.rs`

use crate::cli::directives::DirectivesArgs;

use slurm_launcher::error::LauncherError;
use slurm_launcher::utils::{output, slurm};
use std::fs;
use tabled::{Table, Tabled};

#[derive(Debug, Clone, Tabled)]
struct DirectiveRow {
    #[tabled(rename = "Directive")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// 执行 directives 命令
pub fn execute(args: DirectivesArgs) -> anyhow::Result<()> {
    let script = fs::read_to_string(&args.script).map_err(|e| LauncherError::FileReadError {
        path: args.script.display().to_string(),
        source: e,
    })?;

    output::print_header(&format!("Directives in {}", args.script.display()));

    let rows: Vec<DirectiveRow> = slurm::parse_directives(&script)
        .into_iter()
        .map(|(name, value)| DirectiveRow {
            name: format!("--{}", name),
            value: value.unwrap_or_else(|| "(flag)".to_string()),
        })
        .collect();

    if rows.is_empty() {
        output::print_warning("No #SBATCH directives found");
        return Ok(());
    }

    println!("{}", Table::new(&rows));
    output::print_info(&format!("{} directives", rows.len()));
    Ok(())
}
