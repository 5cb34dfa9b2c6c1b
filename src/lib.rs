//! # slurm-launcher - Slurm 批量作业提交库
//!
//! 把一批参数化任务（每个任务是一组命令行覆盖参数）提交到 Slurm，
//! 可以逐个提交，也可以打包成单个作业数组；每个任务都会得到一个结果。
//!
//! ## 用法
//! ```no_run
//! use slurm_launcher::{Launcher, LauncherConfig};
//! use std::path::{Path, PathBuf};
//!
//! let config = LauncherConfig::from_yaml_file(Path::new("launcher.yaml"))?;
//! let launcher = Launcher::new(config)?;
//! let results = launcher.launch(
//!     &[vec!["lr=0.1".to_string()], vec!["lr=0.01".to_string()]],
//!     &["train".to_string(), "train".to_string()],
//!     &[PathBuf::from("sweep/0"), PathBuf::from("sweep/1")],
//!     Path::new("sweep"),
//! )?;
//! assert_eq!(results.len(), 2);
//! # Ok::<(), slurm_launcher::LauncherError>(())
//! ```
//!
//! ## 依赖关系
//! ```text
//! lib.rs
//!   ├── batch/      (存储、提交客户端、提交引擎)
//!   ├── config.rs   (YAML 配置与 ResourceSpec 构建)
//!   ├── models/     (数据模型)
//!   ├── utils/      (脚本生成、shell 转义、终端输出)
//!   └── error.rs    (错误处理)
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod models;
pub mod utils;

pub use batch::{Launcher, StoreHandle, Submitter};
pub use config::{LauncherConfig, QueueConfig};
pub use error::{LauncherError, Result};
pub use models::{JobStatus, ResourceSpec, SubmissionOutcome, TaskDescriptor};
