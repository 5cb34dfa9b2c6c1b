//! # 启动器配置
//!
//! 从 YAML 文件加载调度器选项与任务入口，并显式构建有序的 `ResourceSpec`。
//! 宿主程序直接调用 `LauncherConfig::from_yaml_file` 或 `Default`，不存在
//! 全局注册。
//!
//! ## 依赖关系
//! - 被 `batch/launcher.rs` 与 `commands/submit.rs` 使用
//! - 使用 `models/resource.rs`

use crate::error::{LauncherError, Result};
use crate::models::{DirectiveValue, ResourceSpec};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// `additional` 中的额外指令值
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum ExtraDirective {
    /// `true` 渲染为开关，`false` 不渲染
    Flag(bool),
    Int(i64),
    Str(String),
}

impl ExtraDirective {
    fn to_value(&self) -> Option<DirectiveValue> {
        match self {
            ExtraDirective::Flag(true) => Some(DirectiveValue::Flag),
            ExtraDirective::Flag(false) => None,
            ExtraDirective::Int(n) => Some(DirectiveValue::Int(*n)),
            ExtraDirective::Str(s) => Some(DirectiveValue::Str(s.clone())),
        }
    }
}

/// Slurm 队列选项
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    #[serde(default = "default_partition")]
    pub partition: String,
    #[serde(default)]
    pub job_name: Option<String>,
    // 设置后以作业数组方式提交
    #[serde(default)]
    pub job_array_name: Option<String>,

    #[serde(default)]
    pub nodes: Option<u32>,
    #[serde(default)]
    pub ntasks: Option<u32>,
    #[serde(default)]
    pub ntasks_per_node: Option<u32>,
    #[serde(default)]
    pub cpus_per_task: Option<u32>,
    #[serde(default)]
    pub mem: Option<String>,
    #[serde(default)]
    pub time: Option<String>,

    #[serde(default)]
    pub gres: Option<String>,
    #[serde(default)]
    pub gpus: Option<u32>,

    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub qos: Option<String>,
    #[serde(default)]
    pub begin: Option<String>,

    #[serde(default)]
    pub mail_type: Option<String>,
    #[serde(default)]
    pub mail_user: Option<String>,

    /// 额外指令，可覆盖上面的同名项
    #[serde(default)]
    pub additional: BTreeMap<String, ExtraDirective>,
    /// 在任务命令之前原样执行的 shell 行
    #[serde(default)]
    pub setup: Vec<String>,
}

fn default_partition() -> String {
    "default".to_string()
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            partition: default_partition(),
            job_name: None,
            job_array_name: None,
            nodes: None,
            ntasks: None,
            ntasks_per_node: None,
            cpus_per_task: None,
            mem: None,
            time: None,
            gres: None,
            gpus: None,
            account: None,
            qos: None,
            begin: None,
            mail_type: None,
            mail_user: None,
            additional: BTreeMap::new(),
            setup: Vec::new(),
        }
    }
}

impl QueueConfig {
    /// 检查互斥选项，`additional` 中的同名键一并计入
    pub fn validate(&self) -> Result<()> {
        if self.extra("job_array_name").is_some() {
            return Err(LauncherError::ConflictingOptions {
                first: "additional.job_array_name".to_string(),
                second: "job_array_name".to_string(),
            });
        }
        if let Some(ExtraDirective::Flag(true)) = self.extra("gpus") {
            return Err(LauncherError::ConfigParseError {
                path: "<queue.additional>".to_string(),
                reason: "'gpus' needs a count".to_string(),
            });
        }

        let gpus = self.gpus.is_some() || self.extra("gpus").is_some();
        let gres = self.gres.is_some() || self.extra("gres").is_some();
        if gpus && gres {
            return Err(LauncherError::ConflictingOptions {
                first: "gpus".to_string(),
                second: "gres".to_string(),
            });
        }
        if self.gpus.is_some() && self.extra("gpus").is_some() {
            return Err(LauncherError::ConflictingOptions {
                first: "gpus".to_string(),
                second: "additional.gpus".to_string(),
            });
        }

        let job_name = self.job_name.is_some() || self.extra("job_name").is_some();
        if job_name && self.job_array_name.is_some() {
            return Err(LauncherError::ConflictingOptions {
                first: "job_name".to_string(),
                second: "job_array_name".to_string(),
            });
        }
        Ok(())
    }

    /// 按下划线形式查找 `additional` 中会被渲染的项
    fn extra(&self, name: &str) -> Option<&ExtraDirective> {
        self.additional
            .iter()
            .find(|(key, value)| {
                key.replace('-', "_") == name && **value != ExtraDirective::Flag(false)
            })
            .map(|(_, value)| value)
    }

    /// 构建有序的资源请求
    ///
    /// `gpus`（含 `additional.gpus`）在此展开为 `gres=gpu:N`，自身从不作为指令输出；
    /// `job_array_name`、`setup`、`additional` 不是指令。
    pub fn resource_spec(&self) -> Result<ResourceSpec> {
        self.validate()?;

        let gpus = match (self.gpus, self.extra("gpus")) {
            (Some(n), _) => Some(n.to_string()),
            (None, Some(ExtraDirective::Int(n))) => Some(n.to_string()),
            (None, Some(ExtraDirective::Str(s))) => Some(s.clone()),
            _ => None,
        };
        let gres = match gpus {
            Some(n) => Some(format!("gpu:{}", n)),
            None => self.gres.clone(),
        };

        let mut spec = ResourceSpec::new();
        spec.set("partition", Some(self.partition.as_str()));
        spec.set("job_name", self.job_name.as_deref());
        spec.set("nodes", self.nodes);
        spec.set("ntasks", self.ntasks);
        spec.set("ntasks_per_node", self.ntasks_per_node);
        spec.set("cpus_per_task", self.cpus_per_task);
        spec.set("mem", self.mem.as_deref());
        spec.set("time", self.time.as_deref());
        spec.set("gres", gres);
        spec.set("account", self.account.as_deref());
        spec.set("qos", self.qos.as_deref());
        spec.set("begin", self.begin.as_deref());
        spec.set("mail_type", self.mail_type.as_deref());
        spec.set("mail_user", self.mail_user.as_deref());

        for (name, extra) in &self.additional {
            let name = name.replace('-', "_");
            if name == "gpus" {
                continue;
            }
            spec.set(&name, extra.to_value());
        }

        Ok(spec)
    }

    pub fn is_array(&self) -> bool {
        self.job_array_name.is_some()
    }
}

/// 启动器完整配置
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LauncherConfig {
    #[serde(default)]
    pub queue: QueueConfig,

    /// 任务入口命令（例如 `python /abs/path/train.py`），原样拼接
    pub entry_point: String,

    /// 强制任务在节点内以非分布式方式运行的覆盖参数
    #[serde(default = "default_local_launcher")]
    pub local_launcher: String,

    /// 调度器提交程序
    #[serde(default = "default_sbatch")]
    pub sbatch: String,

    /// 提交超时（秒），缺省则一直等待
    #[serde(default)]
    pub submit_timeout_secs: Option<u64>,

    /// 数组脚本运行时用于查找任务参数的程序，缺省为当前可执行文件
    #[serde(default)]
    pub lookup_program: Option<PathBuf>,
}

fn default_local_launcher() -> String {
    "hydra.launcher=basic".to_string()
}

fn default_sbatch() -> String {
    "sbatch".to_string()
}

impl Default for LauncherConfig {
    fn default() -> Self {
        LauncherConfig {
            queue: QueueConfig::default(),
            entry_point: String::new(),
            local_launcher: default_local_launcher(),
            sbatch: default_sbatch(),
            submit_timeout_secs: None,
            lookup_program: None,
        }
    }
}

impl LauncherConfig {
    /// 从 YAML 文件加载并校验
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LauncherError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| LauncherError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        let config = Self::from_yaml_str(&content).map_err(|e| match e {
            LauncherError::ConfigParseError { reason, .. } => LauncherError::ConfigParseError {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })?;
        Ok(config)
    }

    /// 从 YAML 文本加载并校验
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: LauncherConfig =
            serde_yaml::from_str(content).map_err(|e| LauncherError::ConfigParseError {
                path: "<inline>".to_string(),
                reason: e.to_string(),
            })?;
        config.queue.validate()?;
        Ok(config)
    }

    pub fn submit_timeout(&self) -> Option<Duration> {
        self.submit_timeout_secs.map(Duration::from_secs)
    }

    /// 查找程序路径：显式配置优先，否则使用当前可执行文件
    pub fn lookup_program(&self) -> Result<PathBuf> {
        match &self.lookup_program {
            Some(p) => Ok(p.clone()),
            None => std::env::current_exe().map_err(|e| LauncherError::FileReadError {
                path: "<current executable>".to_string(),
                source: e,
            }),
        }
    }
}
