//! # 批次提交引擎
//!
//! 把一批任务提交到 Slurm：逐个作为独立作业，或打包成一个作业数组。
//!
//! ## 数组提交流程
//! 1. PREPARING    校验输入长度与内容，创建输出目录，组装任务描述
//! 2. SCRIPT_READY 写入任务描述存储，再生成可执行的数组脚本
//! 3. SUBMITTED    调用 sbatch
//! 4. EXPANDED     把一次提交结果展开为每个任务一个结果，顺序与输入一致
//!
//! 配置错误与写文件错误在提交前直接返回；提交阶段的任何错误都会变成
//! 全部任务 FAILED，调用方总能拿到与输入等长的结果列表。
//!
//! ## 依赖关系
//! - 被 `commands/submit.rs` 调用
//! - 使用 `batch/store.rs`, `batch/submitter.rs`, `utils/slurm.rs`

use crate::batch::store::{self, StoreHandle};
use crate::batch::submitter::{CommandRunner, Submitter, SystemRunner};
use crate::config::LauncherConfig;
use crate::error::{LauncherError, Result};
use crate::models::{ResourceSpec, SubmissionOutcome, TaskDescriptor};
use crate::utils::slurm::{self, ArrayScript, TaskCommand};

use std::fs;
use std::path::{Path, PathBuf};

/// 已准备好、尚未提交的作业数组
#[derive(Debug, Clone)]
pub struct PreparedArray {
    pub array_name: String,
    pub size: usize,
    pub store: StoreHandle,
    pub script_path: PathBuf,
}

/// 已准备好、尚未提交的单个作业
#[derive(Debug, Clone)]
pub struct PreparedJob {
    pub task: TaskDescriptor,
    pub script_path: PathBuf,
}

/// 批次提交引擎
pub struct Launcher<R: CommandRunner = SystemRunner> {
    config: LauncherConfig,
    spec: ResourceSpec,
    command: TaskCommand,
    submitter: Submitter<R>,
}

impl Launcher<SystemRunner> {
    pub fn new(config: LauncherConfig) -> Result<Self> {
        let submitter = Submitter::new(config.sbatch.clone(), config.submit_timeout());
        Self::with_submitter(config, submitter)
    }
}

impl<R: CommandRunner> Launcher<R> {
    /// 使用自定义提交客户端创建引擎；配置在此校验
    pub fn with_submitter(config: LauncherConfig, submitter: Submitter<R>) -> Result<Self> {
        let spec = config.queue.resource_spec()?;
        let command = TaskCommand::new(config.entry_point.clone(), config.local_launcher.clone());
        Ok(Launcher {
            config,
            spec,
            command,
            submitter,
        })
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    pub fn resource_spec(&self) -> &ResourceSpec {
        &self.spec
    }

    /// 创建批次目录，并根据是否配置了 `job_array_name` 选择提交方式
    pub fn launch(
        &self,
        overrides: &[Vec<String>],
        job_names: &[String],
        output_dirs: &[PathBuf],
        batch_dir: &Path,
    ) -> Result<Vec<SubmissionOutcome>> {
        create_dir(batch_dir)?;
        if self.config.queue.is_array() {
            tracing::info!("Submitting {} jobs to SLURM as a job array", overrides.len());
            self.launch_array(overrides, job_names, output_dirs, batch_dir)
        } else {
            tracing::info!("Submitting {} jobs to SLURM individually", overrides.len());
            self.launch_individual(overrides, job_names, output_dirs)
        }
    }

    /// 逐个提交；每个任务的状态只反映 sbatch 是否接受
    pub fn launch_individual(
        &self,
        overrides: &[Vec<String>],
        job_names: &[String],
        output_dirs: &[PathBuf],
    ) -> Result<Vec<SubmissionOutcome>> {
        let jobs = self.prepare_individual(overrides, job_names, output_dirs)?;

        let outcomes = jobs
            .iter()
            .map(|job| {
                tracing::info!(
                    "Submitting job {} with overrides: {}",
                    job.task.task_index,
                    job.task.task_overrides().join(" ")
                );
                self.submitter.submit(&job.script_path)
            })
            .collect();

        Ok(outcomes)
    }

    /// 为每个任务生成单作业脚本 `<output_dir>/<job_name>.sh`
    pub fn prepare_individual(
        &self,
        overrides: &[Vec<String>],
        job_names: &[String],
        output_dirs: &[PathBuf],
    ) -> Result<Vec<PreparedJob>> {
        let tasks = prepare_tasks(overrides, job_names, output_dirs)?;

        tasks
            .into_iter()
            .map(|task| {
                let command = self.command.render(&task.quoted_overrides());
                let script = slurm::compile(
                    &self.spec,
                    &self.config.queue.setup,
                    &task.job_name,
                    &task.output_dir,
                    &command,
                );
                let script_path = task.output_dir.join(format!("{}.sh", task.job_name));
                slurm::write_script(&script_path, &script)?;
                tracing::debug!(script = %script_path.display(), "job script written");
                Ok(PreparedJob { task, script_path })
            })
            .collect()
    }

    /// 作为单个作业数组提交，返回与输入等长、同序的结果
    pub fn launch_array(
        &self,
        overrides: &[Vec<String>],
        job_names: &[String],
        output_dirs: &[PathBuf],
        batch_dir: &Path,
    ) -> Result<Vec<SubmissionOutcome>> {
        let Some(prepared) = self.prepare_array(overrides, job_names, output_dirs, batch_dir)? else {
            return Ok(Vec::new());
        };

        let outcome = self.submitter.submit(&prepared.script_path);
        match &outcome.job_id {
            Some(id) => tracing::info!(
                "Array '{}' submitted as job {} ({} tasks)",
                prepared.array_name,
                id,
                prepared.size
            ),
            None if outcome.is_completed() => tracing::info!(
                "Array '{}' submitted ({} tasks)",
                prepared.array_name,
                prepared.size
            ),
            None => tracing::warn!(
                "Array '{}' submission failed, marking {} tasks as failed",
                prepared.array_name,
                prepared.size
            ),
        }

        Ok(outcome.expand(prepared.size))
    }

    /// 执行数组提交的前两个阶段：写入存储并生成脚本
    ///
    /// 空批次返回 `None`，不写任何文件。
    pub fn prepare_array(
        &self,
        overrides: &[Vec<String>],
        job_names: &[String],
        output_dirs: &[PathBuf],
        batch_dir: &Path,
    ) -> Result<Option<PreparedArray>> {
        let array_name = self
            .config
            .queue
            .job_array_name
            .as_deref()
            .ok_or(LauncherError::MissingArrayName)?;
        let lookup_program = self.config.lookup_program()?;

        let tasks = prepare_tasks(overrides, job_names, output_dirs)?;
        if tasks.is_empty() {
            return Ok(None);
        }

        create_dir(batch_dir)?;
        let store = store::write(batch_dir, array_name, &tasks)?;

        let array = ArrayScript {
            array_name,
            size: tasks.len(),
            store_path: store.path(),
            lookup_program: &lookup_program,
            command: &self.command,
        };
        let script_path =
            slurm::compile_array(&self.spec, &self.config.queue.setup, &array, batch_dir)?;
        tracing::debug!(script = %script_path.display(), "array script written");

        Ok(Some(PreparedArray {
            array_name: array_name.to_string(),
            size: tasks.len(),
            store,
            script_path,
        }))
    }
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| LauncherError::DirectoryCreateError {
        path: path.display().to_string(),
        source: e,
    })
}

/// 校验输入并组装任务描述
///
/// 全部校验通过后才创建输出目录。
fn prepare_tasks(
    overrides: &[Vec<String>],
    job_names: &[String],
    output_dirs: &[PathBuf],
) -> Result<Vec<TaskDescriptor>> {
    if overrides.len() != job_names.len() || overrides.len() != output_dirs.len() {
        return Err(LauncherError::LengthMismatch {
            overrides: overrides.len(),
            job_names: job_names.len(),
            output_dirs: output_dirs.len(),
        });
    }

    let tasks: Vec<TaskDescriptor> = overrides
        .iter()
        .zip(job_names)
        .zip(output_dirs)
        .enumerate()
        .map(|(i, ((o, name), dir))| TaskDescriptor::new(i, o.clone(), name.clone(), dir.clone()))
        .collect();

    for task in &tasks {
        validate_task(task)?;
    }
    for task in &tasks {
        create_dir(&task.output_dir)?;
    }

    Ok(tasks)
}

// 运行时查找按行输出字段，字段内不能含换行
fn validate_task(task: &TaskDescriptor) -> Result<()> {
    let invalid = |reason: &str| LauncherError::InvalidTask {
        index: task.task_index,
        reason: reason.to_string(),
    };

    if task.job_name.trim().is_empty() {
        return Err(invalid("job name is empty"));
    }
    if task.job_name.contains(['\n', '/']) {
        return Err(invalid("job name contains a newline or '/'"));
    }
    if task.output_dir.as_os_str().is_empty() {
        return Err(invalid("output dir is empty"));
    }
    if task.output_dir.display().to_string().contains('\n') {
        return Err(invalid("output dir contains a newline"));
    }
    if task.overrides.iter().any(|o| o.contains('\n')) {
        return Err(invalid("override contains a newline"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::submitter::tests::MockRunner;
    use crate::config::QueueConfig;
    use crate::models::JobStatus;
    use tempfile::TempDir;

    fn array_config() -> LauncherConfig {
        LauncherConfig {
            queue: QueueConfig {
                job_array_name: Some("sweep".into()),
                cpus_per_task: Some(2),
                ..Default::default()
            },
            entry_point: "python /home/u/train.py".into(),
            lookup_program: Some(PathBuf::from("/opt/bin/slurm-launcher")),
            ..Default::default()
        }
    }

    fn batch(root: &Path) -> (Vec<Vec<String>>, Vec<String>, Vec<PathBuf>) {
        let overrides = vec![
            vec!["a=1".to_string()],
            vec!["a=2".to_string()],
            vec!["a=3".to_string()],
        ];
        let names = vec!["train".to_string(); 3];
        let dirs = (0..3).map(|i| root.join("sweep").join(i.to_string())).collect();
        (overrides, names, dirs)
    }

    fn launcher(config: LauncherConfig, runner: MockRunner) -> Launcher<MockRunner> {
        Launcher::with_submitter(config, Submitter::with_runner("sbatch", None, runner)).unwrap()
    }

    #[test]
    fn test_launch_array_success_expands_ids() {
        let dir = TempDir::new().unwrap();
        let (overrides, names, dirs) = batch(dir.path());
        let runner = MockRunner::accepting("555");
        let launcher = launcher(array_config(), runner.clone());

        let results = launcher
            .launch_array(&overrides, &names, &dirs, dir.path())
            .unwrap();

        let ids: Vec<_> = results.iter().map(|r| r.job_id.as_deref()).collect();
        assert_eq!(ids, vec![Some("555_0"), Some("555_1"), Some("555_2")]);
        assert!(results.iter().all(|r| r.status == JobStatus::Completed));

        assert_eq!(runner.call_count(), 1);
        let script = dir.path().join("sweep_array.sh");
        assert_eq!(
            runner.calls.lock().unwrap()[0][1],
            script.display().to_string()
        );
        assert!(dir.path().join("sweep_array_config.json").exists());
        assert!(dirs.iter().all(|d| d.is_dir()));
    }

    #[test]
    fn test_launch_array_failure_marks_all_failed() {
        let dir = TempDir::new().unwrap();
        let (overrides, names, dirs) = batch(dir.path());
        let launcher = launcher(array_config(), MockRunner::rejecting("sbatch: error"));

        let results = launcher
            .launch_array(&overrides, &names, &dirs, dir.path())
            .unwrap();

        assert_eq!(results.len(), 3);
        assert!(results
            .iter()
            .all(|r| r.status == JobStatus::Failed && r.job_id.is_none()));
    }

    #[test]
    fn test_launch_array_runner_error_is_not_propagated() {
        let dir = TempDir::new().unwrap();
        let (overrides, names, dirs) = batch(dir.path());
        let runner = MockRunner::new(|_, _| {
            Err(LauncherError::CommandTimeout {
                command: "sbatch".into(),
                secs: 1,
            })
        });
        let launcher = launcher(array_config(), runner);

        let results = launcher
            .launch_array(&overrides, &names, &dirs, dir.path())
            .unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.status == JobStatus::Failed));
    }

    #[test]
    fn test_length_mismatch_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let (overrides, names, mut dirs) = batch(dir.path());
        dirs.pop();
        let runner = MockRunner::accepting("1");
        let launcher = launcher(array_config(), runner.clone());

        let err = launcher
            .launch_array(&overrides, &names, &dirs, dir.path())
            .unwrap_err();
        assert!(matches!(err, LauncherError::LengthMismatch { .. }));
        assert!(err.is_configuration());
        assert!(!dir.path().join("sweep_array_config.json").exists());
        assert!(!dir.path().join("sweep").exists());
        assert_eq!(runner.call_count(), 0);
    }

    #[test]
    fn test_conflicting_config_rejected_before_launch() {
        let mut config = array_config();
        config.queue.job_name = Some("fixed".into());
        let result = Launcher::with_submitter(
            config,
            Submitter::with_runner("sbatch", None, MockRunner::accepting("1")),
        );
        assert!(matches!(
            result,
            Err(LauncherError::ConflictingOptions { .. })
        ));
    }

    #[test]
    fn test_launch_array_requires_array_name() {
        let dir = TempDir::new().unwrap();
        let (overrides, names, dirs) = batch(dir.path());
        let mut config = array_config();
        config.queue.job_array_name = None;
        let launcher = launcher(config, MockRunner::accepting("1"));

        assert!(matches!(
            launcher.launch_array(&overrides, &names, &dirs, dir.path()),
            Err(LauncherError::MissingArrayName)
        ));
    }

    #[test]
    fn test_empty_batch_submits_nothing() {
        let dir = TempDir::new().unwrap();
        let runner = MockRunner::accepting("1");
        let launcher = launcher(array_config(), runner.clone());

        let results = launcher.launch_array(&[], &[], &[], dir.path()).unwrap();
        assert!(results.is_empty());
        assert_eq!(runner.call_count(), 0);
        assert!(!dir.path().join("sweep_array.sh").exists());
    }

    #[test]
    fn test_prepare_array_script_contents() {
        let dir = TempDir::new().unwrap();
        let (overrides, names, dirs) = batch(dir.path());
        let launcher = launcher(array_config(), MockRunner::accepting("1"));

        let prepared = launcher
            .prepare_array(&overrides, &names, &dirs, dir.path())
            .unwrap()
            .unwrap();
        assert_eq!(prepared.size, 3);
        assert_eq!(prepared.store.lookup(2).unwrap().overrides, "a=3");

        let script = fs::read_to_string(&prepared.script_path).unwrap();
        assert!(script.contains("#SBATCH --array=0-2\n"));
        assert!(script.contains("#SBATCH --cpus-per-task=2\n"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&prepared.script_path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn test_invalid_task_rejected() {
        let dir = TempDir::new().unwrap();
        let (overrides, mut names, dirs) = batch(dir.path());
        names[1] = "bad\nname".into();
        let launcher = launcher(array_config(), MockRunner::accepting("1"));

        assert!(matches!(
            launcher.launch_array(&overrides, &names, &dirs, dir.path()),
            Err(LauncherError::InvalidTask { index: 1, .. })
        ));
    }

    #[test]
    fn test_resource_spec_built_from_config() {
        let launcher = launcher(array_config(), MockRunner::accepting("1"));
        assert!(launcher.config().queue.is_array());
        assert_eq!(
            launcher.resource_spec().get("cpus_per_task"),
            Some(&crate::models::DirectiveValue::Int(2))
        );
        assert!(!launcher.resource_spec().contains("job_array_name"));
    }

    #[test]
    fn test_launch_individual() {
        let dir = TempDir::new().unwrap();
        let (overrides, _, dirs) = batch(dir.path());
        let names: Vec<String> = (0..3).map(|i| format!("job{}", i)).collect();
        let mut config = array_config();
        config.queue.job_array_name = None;
        let runner = MockRunner::accepting("900");
        let launcher = launcher(config, runner.clone());

        let batch_dir = dir.path().join("batch");
        let results = launcher.launch(&overrides, &names, &dirs, &batch_dir).unwrap();

        assert!(batch_dir.is_dir());
        assert_eq!(results.len(), 3);
        assert!(results
            .iter()
            .all(|r| r.is_completed() && r.job_id.as_deref() == Some("900")));
        assert_eq!(runner.call_count(), 3);

        let script = fs::read_to_string(dirs[1].join("job1.sh")).unwrap();
        assert!(script.contains("#SBATCH --job-name=job1\n"));
        assert!(script.ends_with("python /home/u/train.py hydra.launcher=basic a=2\n"));
    }

    #[test]
    fn test_launch_individual_failure_per_task() {
        let dir = TempDir::new().unwrap();
        let (overrides, names, dirs) = batch(dir.path());
        let mut config = array_config();
        config.queue.job_array_name = None;
        let launcher = launcher(config, MockRunner::rejecting("denied"));

        let results = launcher
            .launch_individual(&overrides, &names, &dirs)
            .unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.status == JobStatus::Failed));
    }
}
