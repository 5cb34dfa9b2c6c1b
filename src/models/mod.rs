//! # 数据模型模块
//!
//! 定义资源请求、任务描述和提交结果的数据模型。
//!
//! ## 依赖关系
//! - 被 `config.rs`, `batch/` 和 `utils/slurm.rs` 使用
//! - 子模块: resource, task, outcome

pub mod outcome;
pub mod resource;
pub mod task;

pub use outcome::{JobStatus, SubmissionOutcome};
pub use resource::{DirectiveValue, ResourceSpec};
pub use task::{filter_overrides, TaskDescriptor, TaskRecord};
