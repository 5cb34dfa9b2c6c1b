//! # submit 命令实现
//!
//! 读取任务列表并批量提交到 Slurm。
//!
//! ## 功能
//! - 加载 YAML 配置并应用命令行覆盖
//! - 读取任务 CSV（job_name, output_dir, overrides）
//! - 以单作业或作业数组方式提交，或仅生成脚本（--dry-run）
//! - 打印每个任务的提交结果
//!
//! ## 依赖关系
//! - 使用 `cli/submit.rs` 定义的参数
//! - 使用 `batch/launcher.rs`, `utils/output.rs`, `utils/progress.rs`

use crate::cli::submit::SubmitArgs;

use anyhow::{bail, Context};
use serde::Deserialize;
use slurm_launcher::batch::Launcher;
use slurm_launcher::config::LauncherConfig;
use slurm_launcher::error::LauncherError;
use slurm_launcher::models::SubmissionOutcome;
use slurm_launcher::utils::{output, progress, slurm};
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

/// 任务 CSV 的一行
#[derive(Debug, Deserialize)]
struct TaskRow {
    job_name: String,
    output_dir: PathBuf,
    #[serde(default)]
    overrides: String,
}

/// 提交结果行
#[derive(Debug, Clone, Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Task")]
    index: usize,
    #[tabled(rename = "Job Name")]
    job_name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Job ID")]
    job_id: String,
}

/// 解析后的任务列表
struct TaskList {
    overrides: Vec<Vec<String>>,
    job_names: Vec<String>,
    output_dirs: Vec<PathBuf>,
}

impl TaskList {
    fn len(&self) -> usize {
        self.job_names.len()
    }
}

/// 执行 submit 命令
pub fn execute(args: SubmitArgs) -> anyhow::Result<()> {
    output::print_header("Slurm Batch Submission");

    let config = load_config(&args)?;
    let tasks = read_tasks(&args.tasks)
        .with_context(|| format!("reading tasks from {}", args.tasks.display()))?;
    output::print_info(&format!(
        "Loaded {} tasks from {}",
        tasks.len(),
        args.tasks.display()
    ));

    let batch_dir = absolute(&args.batch_dir)?;
    let launcher = Launcher::new(config)?;

    if args.dry_run {
        return dry_run(&launcher, &tasks, &batch_dir);
    }

    let pb = progress::create_spinner(if launcher.config().queue.is_array() {
        "Submitting job array..."
    } else {
        "Submitting jobs..."
    });
    let results = launcher.launch(
        &tasks.overrides,
        &tasks.job_names,
        &tasks.output_dirs,
        &batch_dir,
    );
    pb.finish_and_clear();
    let results = results?;

    report(&tasks, &results)
}

/// 加载配置并应用命令行覆盖
fn load_config(args: &SubmitArgs) -> anyhow::Result<LauncherConfig> {
    let mut config = LauncherConfig::from_yaml_file(&args.config)
        .with_context(|| format!("loading launcher config {}", args.config.display()))?;

    if let Some(name) = &args.array_name {
        config.queue.job_array_name = Some(name.clone());
    }
    if let Some(partition) = &args.partition {
        config.queue.partition = partition.clone();
    }
    if let Some(entry) = &args.entry_point {
        config.entry_point = entry.clone();
    }
    if let Some(sbatch) = &args.sbatch {
        config.sbatch = sbatch.clone();
    }
    if let Some(secs) = args.timeout {
        config.submit_timeout_secs = Some(secs);
    }

    if config.entry_point.trim().is_empty() {
        bail!("No task entry point configured (set 'entry_point' or pass --entry-point)");
    }
    config.queue.validate()?;

    Ok(config)
}

/// 读取任务 CSV
fn read_tasks(path: &Path) -> Result<TaskList, LauncherError> {
    if !path.exists() {
        return Err(LauncherError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let mut tasks = TaskList {
        overrides: Vec::new(),
        job_names: Vec::new(),
        output_dirs: Vec::new(),
    };

    for row in reader.deserialize::<TaskRow>() {
        let row = row?;
        tasks
            .overrides
            .push(row.overrides.split_whitespace().map(str::to_string).collect());
        tasks.job_names.push(row.job_name);
        tasks.output_dirs.push(absolute(&row.output_dir)?);
    }

    Ok(tasks)
}

/// 计算节点上的工作目录可能不同，统一使用绝对路径
fn absolute(path: &Path) -> Result<PathBuf, LauncherError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| LauncherError::FileReadError {
        path: ".".to_string(),
        source: e,
    })?;
    Ok(cwd.join(path))
}

/// 只生成脚本与任务存储
fn dry_run(
    launcher: &Launcher,
    tasks: &TaskList,
    batch_dir: &Path,
) -> anyhow::Result<()> {
    for line in slurm::render_directives(launcher.resource_spec()) {
        output::print_info(&line);
    }

    if launcher.config().queue.is_array() {
        match launcher.prepare_array(
            &tasks.overrides,
            &tasks.job_names,
            &tasks.output_dirs,
            batch_dir,
        )? {
            Some(prepared) => {
                output::print_path("store", prepared.store.path());
                output::print_path("script", &prepared.script_path);
                output::print_done(&format!(
                    "[DRY] Generated job array '{}' with {} tasks",
                    prepared.array_name, prepared.size
                ));
            }
            None => output::print_warning("No tasks to prepare"),
        }
    } else {
        let jobs =
            launcher.prepare_individual(&tasks.overrides, &tasks.job_names, &tasks.output_dirs)?;
        for job in &jobs {
            output::print_path(&job.task.task_index.to_string(), &job.script_path);
        }
        output::print_done(&format!("[DRY] Generated {} job scripts", jobs.len()));
    }
    Ok(())
}

/// 打印结果表格与汇总
fn report(tasks: &TaskList, results: &[SubmissionOutcome]) -> anyhow::Result<()> {
    let rows: Vec<OutcomeRow> = results
        .iter()
        .zip(&tasks.job_names)
        .enumerate()
        .map(|(index, (outcome, job_name))| OutcomeRow {
            index,
            job_name: job_name.clone(),
            status: outcome.status.to_string(),
            job_id: outcome.job_id.clone().unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    if !rows.is_empty() {
        println!("{}", Table::new(&rows));
    }

    let mut failed = 0;
    for (index, (outcome, job_name)) in results.iter().zip(&tasks.job_names).enumerate() {
        if !outcome.is_completed() {
            failed += 1;
            let detail = outcome.detail.as_deref().unwrap_or("submission failed");
            output::print_task_failure(index, job_name, detail);
        }
    }

    output::print_separator();
    if failed == 0 {
        output::print_success(&format!("Submitted {} tasks", results.len()));
        Ok(())
    } else {
        output::print_warning(&format!(
            "{} of {} tasks failed to submit",
            failed,
            results.len()
        ));
        bail!("{} of {} tasks failed to submit", failed, results.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_read_tasks() {
        let dir = TempDir::new().unwrap();
        let csv_path = dir.path().join("tasks.csv");
        fs::write(
            &csv_path,
            "job_name,output_dir,overrides\n\
             train,/sweep/0,lr=0.1 batch=32\n\
             train,/sweep/1,\n",
        )
        .unwrap();

        let tasks = read_tasks(&csv_path).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks.overrides[0], vec!["lr=0.1", "batch=32"]);
        assert!(tasks.overrides[1].is_empty());
        assert_eq!(tasks.output_dirs[1], PathBuf::from("/sweep/1"));
    }

    #[test]
    fn test_read_tasks_missing_file() {
        let result = read_tasks(Path::new("/nonexistent/tasks.csv"));
        assert!(matches!(result, Err(LauncherError::FileNotFound { .. })));
    }

    #[test]
    fn test_absolute_keeps_absolute_paths() {
        assert_eq!(
            absolute(Path::new("/scratch/run")).unwrap(),
            PathBuf::from("/scratch/run")
        );
        assert!(absolute(Path::new("relative/run")).unwrap().is_absolute());
    }
}
