//! # sbatch 提交客户端
//!
//! 调用调度器的提交命令，从 stdout 中提取作业号并把结果分类为
//! COMPLETED / FAILED。任何调用层面的错误（找不到程序、超时、非零退出）
//! 都转换为 FAILED 结果，不会向上抛出。
//!
//! ## 依赖关系
//! - 被 `batch/launcher.rs` 使用
//! - 使用 `wait-timeout` 限制提交耗时

use crate::error::{LauncherError, Result};
use crate::models::SubmissionOutcome;

use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// sbatch 成功提交时输出的确认语
pub const SUBMITTED_MARKER: &str = "Submitted batch job";

/// 外部命令的输出
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// 外部命令执行接口，便于在测试中替换
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str], timeout: Option<Duration>) -> Result<CommandOutput>;
}

/// 直接调用系统进程
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], timeout: Option<Duration>) -> Result<CommandOutput> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => LauncherError::CommandNotFound {
                    command: program.to_string(),
                },
                _ => LauncherError::CommandIo {
                    command: program.to_string(),
                    source: e,
                },
            })?;

        let io_err = |e: std::io::Error| LauncherError::CommandIo {
            command: program.to_string(),
            source: e,
        };

        // 等待期间持续读取管道，避免输出填满缓冲区后子进程阻塞
        let stdout_reader = child.stdout.take().map(drain);
        let stderr_reader = child.stderr.take().map(drain);

        let status = match timeout {
            Some(limit) => match child.wait_timeout(limit).map_err(io_err)? {
                Some(status) => status,
                None => {
                    child.kill().ok();
                    child.wait().ok();
                    return Err(LauncherError::CommandTimeout {
                        command: program.to_string(),
                        secs: limit.as_secs(),
                    });
                }
            },
            None => child.wait().map_err(io_err)?,
        };

        let stdout = collect(stdout_reader).map_err(io_err)?;
        let stderr = collect(stderr_reader).map_err(io_err)?;

        Ok(CommandOutput {
            success: status.success(),
            stdout,
            stderr,
        })
    }
}

fn drain<P: Read + Send + 'static>(mut pipe: P) -> JoinHandle<std::io::Result<String>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    })
}

fn collect(reader: Option<JoinHandle<std::io::Result<String>>>) -> std::io::Result<String> {
    match reader {
        Some(handle) => handle
            .join()
            .unwrap_or_else(|_| Err(std::io::Error::other("pipe reader panicked"))),
        None => Ok(String::new()),
    }
}

/// 从 sbatch 输出中提取作业号（确认行的最后一个字段）
pub fn parse_job_id(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .filter(|line| line.contains(SUBMITTED_MARKER))
        .filter_map(|line| line.split_whitespace().last())
        .last()
        .map(str::to_string)
}

/// 提交客户端
#[derive(Debug, Clone)]
pub struct Submitter<R: CommandRunner = SystemRunner> {
    program: String,
    timeout: Option<Duration>,
    runner: R,
}

impl Submitter<SystemRunner> {
    pub fn new(program: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self::with_runner(program, timeout, SystemRunner)
    }
}

impl<R: CommandRunner> Submitter<R> {
    pub fn with_runner(program: impl Into<String>, timeout: Option<Duration>, runner: R) -> Self {
        Submitter {
            program: program.into(),
            timeout,
            runner,
        }
    }

    /// 提交脚本并分类结果
    pub fn submit(&self, script_path: &Path) -> SubmissionOutcome {
        let script = script_path.display().to_string();

        match self.runner.run(&self.program, &[script.as_str()], self.timeout) {
            Ok(output) if output.success => {
                let job_id = parse_job_id(&output.stdout);
                if job_id.is_none() {
                    tracing::warn!(script = %script, "submission accepted without a job id");
                }
                SubmissionOutcome::completed(job_id)
            }
            Ok(output) => {
                let err = LauncherError::CommandFailed {
                    command: format!("{} {}", self.program, script),
                    stderr: output.stderr.trim().to_string(),
                };
                tracing::warn!(script = %script, "{}", err);
                SubmissionOutcome::failed(err.to_string())
            }
            Err(e) => {
                tracing::warn!(script = %script, "{}", e);
                SubmissionOutcome::failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::JobStatus;
    use std::sync::{Arc, Mutex};

    type RunFn = Box<dyn Fn(&str, &[&str]) -> Result<CommandOutput> + Send + Sync>;

    /// 可配置行为的模拟执行器，记录每次调用的参数
    #[derive(Clone)]
    pub struct MockRunner {
        run_fn: Arc<RunFn>,
        pub calls: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl MockRunner {
        pub fn new<F>(f: F) -> Self
        where
            F: Fn(&str, &[&str]) -> Result<CommandOutput> + Send + Sync + 'static,
        {
            let run_fn: RunFn = Box::new(f);
            MockRunner {
                run_fn: Arc::new(run_fn),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn accepting(job_id: &str) -> Self {
            let stdout = format!("{} {}\n", SUBMITTED_MARKER, job_id);
            Self::new(move |_, _| {
                Ok(CommandOutput {
                    success: true,
                    stdout: stdout.clone(),
                    stderr: String::new(),
                })
            })
        }

        pub fn rejecting(stderr: &str) -> Self {
            let stderr = stderr.to_string();
            Self::new(move |_, _| {
                Ok(CommandOutput {
                    success: false,
                    stdout: String::new(),
                    stderr: stderr.clone(),
                })
            })
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl CommandRunner for MockRunner {
        fn run(&self, program: &str, args: &[&str], _timeout: Option<Duration>) -> Result<CommandOutput> {
            let mut call = vec![program.to_string()];
            call.extend(args.iter().map(|a| a.to_string()));
            self.calls.lock().unwrap().push(call);
            (self.run_fn)(program, args)
        }
    }

    #[test]
    fn test_parse_job_id() {
        assert_eq!(parse_job_id("Submitted batch job 555\n"), Some("555".to_string()));
        assert_eq!(
            parse_job_id("sbatch: warning: requested memory rounded up\nSubmitted batch job 42\n"),
            Some("42".to_string())
        );
        assert_eq!(parse_job_id("nothing here"), None);
        assert_eq!(parse_job_id(""), None);
    }

    #[test]
    fn test_submit_success() {
        let runner = MockRunner::accepting("555");
        let submitter = Submitter::with_runner("sbatch", None, runner.clone());
        let outcome = submitter.submit(Path::new("/b/sweep_array.sh"));

        assert_eq!(outcome.status, JobStatus::Completed);
        assert_eq!(outcome.job_id.as_deref(), Some("555"));
        assert_eq!(
            runner.calls.lock().unwrap()[0],
            vec!["sbatch".to_string(), "/b/sweep_array.sh".to_string()]
        );
    }

    #[test]
    fn test_submit_success_without_ack_line() {
        let runner = MockRunner::new(|_, _| {
            Ok(CommandOutput {
                success: true,
                stdout: "queued\n".to_string(),
                stderr: String::new(),
            })
        });
        let outcome = Submitter::with_runner("sbatch", None, runner).submit(Path::new("x.sh"));
        assert_eq!(outcome.status, JobStatus::Completed);
        assert!(outcome.job_id.is_none());
    }

    #[test]
    fn test_submit_nonzero_exit() {
        let runner = MockRunner::rejecting("sbatch: error: invalid partition");
        let outcome = Submitter::with_runner("sbatch", None, runner).submit(Path::new("x.sh"));
        assert_eq!(outcome.status, JobStatus::Failed);
        assert!(outcome.job_id.is_none());
        assert!(outcome.detail.unwrap().contains("invalid partition"));
    }

    #[test]
    fn test_submit_runner_error_becomes_failed() {
        let runner = MockRunner::new(|program, _| {
            Err(LauncherError::CommandNotFound {
                command: program.to_string(),
            })
        });
        let outcome = Submitter::with_runner("sbatch", None, runner).submit(Path::new("x.sh"));
        assert_eq!(outcome.status, JobStatus::Failed);
        assert!(outcome.job_id.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_missing_program() {
        let result = SystemRunner.run("definitely-not-a-real-sbatch", &[], None);
        assert!(matches!(result, Err(LauncherError::CommandNotFound { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_timeout() {
        let result = SystemRunner.run("sleep", &["5"], Some(Duration::from_millis(100)));
        assert!(matches!(result, Err(LauncherError::CommandTimeout { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_captures_stdout() {
        let output = SystemRunner
            .run("echo", &["Submitted batch job 7"], Some(Duration::from_secs(5)))
            .unwrap();
        assert!(output.success);
        assert_eq!(parse_job_id(&output.stdout), Some("7".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_large_stderr_does_not_block() {
        let script = "head -c 200000 /dev/zero | tr '\\0' x >&2; echo 'Submitted batch job 9'";
        for timeout in [Some(Duration::from_secs(10)), None] {
            let output = SystemRunner.run("sh", &["-c", script], timeout).unwrap();
            assert!(output.success);
            assert_eq!(output.stderr.len(), 200000);
            assert_eq!(parse_job_id(&output.stdout), Some("9".to_string()));
        }
    }
}
