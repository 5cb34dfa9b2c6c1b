//! # Slurm 脚本生成工具
//!
//! 生成 sbatch 提交脚本，支持单作业与作业数组两种形式，并能把脚本中的
//! `#SBATCH` 指令解析回键值对。
//!
//! ## 脚本结构
//! ```text
//! #!/bin/bash
//! # SLURM parameters      指令块（顺序与 ResourceSpec 一致）
//! # Get task-specific...  仅数组：按 SLURM_ARRAY_TASK_ID 查找任务参数
//! # Setup commands        用户 setup 行
//! # Run the command       任务命令
//! ```
//!
//! ## 依赖关系
//! - 被 `batch/launcher.rs` 使用
//! - 使用 `models/resource.rs`, `utils/shell.rs`

use crate::error::{LauncherError, Result};
use crate::models::{DirectiveValue, ResourceSpec};
use crate::utils::shell;

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// 数组成员丢弃调度器自身输出的位置
pub const NULL_SINK: &str = "/dev/null";

/// 调度器在运行时提供的数组环境变量
pub const ARRAY_TASK_ID_VAR: &str = "SLURM_ARRAY_TASK_ID";
pub const ARRAY_JOB_ID_VAR: &str = "SLURM_ARRAY_JOB_ID";

/// 任务入口命令模板
#[derive(Debug, Clone)]
pub struct TaskCommand {
    /// 任务入口，原样输出
    pub entry_point: String,
    /// 强制非分布式运行的覆盖参数
    pub local_launcher: String,
}

impl TaskCommand {
    pub fn new(entry_point: impl Into<String>, local_launcher: impl Into<String>) -> Self {
        TaskCommand {
            entry_point: entry_point.into(),
            local_launcher: local_launcher.into(),
        }
    }

    /// 拼接已转义的覆盖参数
    pub fn render(&self, quoted_overrides: &str) -> String {
        let mut command = self.entry_point.trim().to_string();
        if !self.local_launcher.is_empty() {
            command.push(' ');
            command.push_str(&shell::quote(&self.local_launcher));
        }
        if !quoted_overrides.is_empty() {
            command.push(' ');
            command.push_str(quoted_overrides);
        }
        command
    }
}

/// 作业数组脚本的输入
#[derive(Debug, Clone)]
pub struct ArrayScript<'a> {
    pub array_name: &'a str,
    pub size: usize,
    /// 任务描述存储文件
    pub store_path: &'a Path,
    /// 运行时查找任务参数的程序（支持 `lookup <store> <index>`）
    pub lookup_program: &'a Path,
    pub command: &'a TaskCommand,
}

impl ArrayScript<'_> {
    /// 数组范围 `0-<size-1>`
    pub fn range(&self) -> String {
        format!("0-{}", self.size.saturating_sub(1))
    }

    /// 脚本文件位置 `<batch_dir>/<array_name>_array.sh`
    pub fn script_path(&self, batch_dir: &Path) -> PathBuf {
        batch_dir.join(format!("{}_array.sh", self.array_name))
    }
}

/// 渲染单条指令
pub fn render_directive(name: &str, value: &DirectiveValue) -> String {
    let key = name.replace('_', "-");
    match value {
        DirectiveValue::Flag => format!("#SBATCH --{}", key),
        other => format!("#SBATCH --{}={}", key, shell::quote(&other.to_string())),
    }
}

/// 按顺序渲染全部指令
pub fn render_directives(spec: &ResourceSpec) -> Vec<String> {
    spec.iter()
        .map(|(name, value)| render_directive(name, value))
        .collect()
}

/// 单作业模式下实际渲染的资源请求
///
/// 未配置 job_name 时使用任务自己的作业名；输出/错误文件指向
/// `<output_dir>/<job_name>_%j.out|.err`，除非用户在 `additional` 中显式给出。
pub fn single_job_spec(spec: &ResourceSpec, job_name: &str, output_dir: &Path) -> ResourceSpec {
    let effective_name = match spec.get("job_name") {
        Some(DirectiveValue::Str(name)) => name.clone(),
        _ => job_name.to_string(),
    };

    let mut derived = spec.clone();
    if !derived.contains("job_name") {
        derived = derived.prepend(vec![("job_name".to_string(), job_name.into())]);
    }
    if !derived.contains("output") {
        derived.set(
            "output",
            Some(format!("{}/{}_%j.out", output_dir.display(), effective_name)),
        );
    }
    if !derived.contains("error") {
        derived.set(
            "error",
            Some(format!("{}/{}_%j.err", output_dir.display(), effective_name)),
        );
    }
    derived
}

/// 作业数组模式下实际渲染的资源请求
pub fn array_spec(spec: &ResourceSpec, array: &ArrayScript) -> ResourceSpec {
    spec.clone()
        .prepend(vec![
            ("job_name".to_string(), array.array_name.into()),
            ("output".to_string(), NULL_SINK.into()),
            ("error".to_string(), NULL_SINK.into()),
        ])
        .with("array", array.range())
}

fn header(spec: &ResourceSpec) -> Vec<String> {
    let mut lines = vec![
        "#!/bin/bash".to_string(),
        String::new(),
        "# SLURM parameters".to_string(),
    ];
    lines.extend(render_directives(spec));
    lines
}

fn setup_block(setup: &[String]) -> Vec<String> {
    if setup.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![String::new(), "# Setup commands".to_string()];
    lines.extend(setup.iter().cloned());
    lines
}

/// 生成单作业脚本内容
pub fn compile(
    spec: &ResourceSpec,
    setup: &[String],
    job_name: &str,
    output_dir: &Path,
    command: &str,
) -> String {
    let mut lines = header(&single_job_spec(spec, job_name, output_dir));
    lines.extend(setup_block(setup));
    lines.push(String::new());
    lines.push("# Run the command".to_string());
    lines.push(command.to_string());
    lines.join("\n") + "\n"
}

/// 生成作业数组脚本内容
pub fn render_array_script(spec: &ResourceSpec, setup: &[String], array: &ArrayScript) -> String {
    let mut lines = header(&array_spec(spec, array));

    let lookup = format!(
        "{} lookup {} \"${}\"",
        shell::quote(&array.lookup_program.display().to_string()),
        shell::quote(&array.store_path.display().to_string()),
        ARRAY_TASK_ID_VAR,
    );
    let log_stem = format!(
        "$OUTPUT_DIR/${{JOB_NAME}}_${{{}}}_${{{}}}",
        ARRAY_JOB_ID_VAR, ARRAY_TASK_ID_VAR
    );

    lines.push(format!(
        r#"
# Get task-specific configuration
TASK_CONFIG=$({lookup})
if [ $? -ne 0 ]; then
    echo "Error: Could not retrieve configuration for task ${task_var}" >&2
    exit 1
fi

# Extract task-specific information
OVERRIDES=$(printf '%s\n' "$TASK_CONFIG" | sed -n '1p')
JOB_NAME=$(printf '%s\n' "$TASK_CONFIG" | sed -n '2p')
OUTPUT_DIR=$(printf '%s\n' "$TASK_CONFIG" | sed -n '3p')

# Create output directory if it doesn't exist
mkdir -p "$OUTPUT_DIR"

# Redirect all output to the job-specific files
exec > "{log_stem}.out"
exec 2> "{log_stem}.err""#,
        lookup = lookup,
        task_var = ARRAY_TASK_ID_VAR,
        log_stem = log_stem,
    ));

    lines.extend(setup_block(setup));
    lines.push(String::new());
    lines.push("# Run the command".to_string());
    lines.push("eval \"set -- $OVERRIDES\"".to_string());
    lines.push(array.command.render("\"$@\""));
    lines.join("\n") + "\n"
}

/// 生成作业数组脚本并写入 `batch_dir`，返回脚本路径
pub fn compile_array(
    spec: &ResourceSpec,
    setup: &[String],
    array: &ArrayScript,
    batch_dir: &Path,
) -> Result<PathBuf> {
    let script = render_array_script(spec, setup, array);
    let path = array.script_path(batch_dir);
    write_script(&path, &script)?;
    Ok(path)
}

/// 写入脚本并设置可执行权限
pub fn write_script(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| LauncherError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|e| {
            LauncherError::FileWriteError {
                path: path.display().to_string(),
                source: e,
            }
        })?;
    }

    Ok(())
}

fn directive_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^#SBATCH\s+--([A-Za-z0-9][A-Za-z0-9-]*)(?:=(.*))?\s*$")
            .expect("directive pattern is valid")
    })
}

/// 解析脚本中的 `#SBATCH` 指令
///
/// 返回 `(连字符形式的名称, 还原转义后的值)`，开关类指令值为 `None`。
pub fn parse_directives(script: &str) -> Vec<(String, Option<String>)> {
    script
        .lines()
        .filter_map(|line| directive_pattern().captures(line.trim_end()))
        .map(|caps| {
            let name = caps[1].to_string();
            let value = caps.get(2).map(|m| {
                let raw = m.as_str();
                shell::unquote(raw).unwrap_or_else(|| raw.to_string())
            });
            (name, value)
        })
        .collect()
}
