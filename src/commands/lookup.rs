//! # lookup 命令实现
//!
//! 数组成员运行时调用：按序号从任务存储中读取参数，
//! 依次输出 overrides、job_name、output_dir，每行一个。
//! 序号越界时以非零状态退出，脚本据此在运行任务前失败。
//!
//! ## 依赖关系
//! - 使用 `cli/lookup.rs` 定义的参数
//! - 使用 `batch/store.rs`

use crate::cli::lookup::LookupArgs;

use slurm_launcher::batch::store;
use slurm_launcher::models::TaskRecord;
use std::io::{self, Write};

/// 执行 lookup 命令
pub fn execute(args: LookupArgs) -> anyhow::Result<()> {
    let record = store::lookup(&args.store, args.index)?;
    let stdout = io::stdout();
    write_record(&mut stdout.lock(), &record)?;
    Ok(())
}

fn write_record<W: Write>(out: &mut W, record: &TaskRecord) -> io::Result<()> {
    writeln!(out, "{}", record.overrides)?;
    writeln!(out, "{}", record.job_name)?;
    writeln!(out, "{}", record.output_dir)?;
    out.flush()
}
