//! # 批次提交模块
//!
//! 把一批参数化任务提交到 Slurm。
//!
//! ## 功能
//! - 任务描述存储（供数组成员运行时读取）
//! - sbatch 提交与结果分类
//! - 单作业 / 作业数组两种提交方式
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `utils/slurm.rs` 生成脚本
//! - 子模块: store, submitter, launcher

pub mod launcher;
pub mod store;
pub mod submitter;

pub use launcher::{Launcher, PreparedArray, PreparedJob};
pub use store::StoreHandle;
pub use submitter::{CommandOutput, CommandRunner, Submitter, SystemRunner};
