//! # 提交结果数据模型
//!
//! 一次调度器调用对应一个 `SubmissionOutcome`；数组提交会把它展开为
//! 每个任务一个结果。
//!
//! ## 依赖关系
//! - 被 `batch/submitter.rs`, `batch/launcher.rs` 使用
//! - 被 `commands/submit.rs` 展示

use serde::{Deserialize, Serialize};

/// 提交状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Completed,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Completed => write!(f, "COMPLETED"),
            JobStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// 调度器提交结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub status: JobStatus,
    /// 调度器分配的作业号；数组成员形如 `<job_id>_<task_index>`
    pub job_id: Option<String>,
    /// 失败原因（stderr 或调用错误）
    pub detail: Option<String>,
}

impl SubmissionOutcome {
    pub fn completed(job_id: Option<String>) -> Self {
        SubmissionOutcome {
            status: JobStatus::Completed,
            job_id,
            detail: None,
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        SubmissionOutcome {
            status: JobStatus::Failed,
            job_id: None,
            detail: Some(detail.into()),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }

    /// 把一次数组提交的结果展开为 `size` 个按序排列的任务结果
    pub fn expand(&self, size: usize) -> Vec<SubmissionOutcome> {
        (0..size)
            .map(|i| match self.status {
                JobStatus::Completed => SubmissionOutcome {
                    status: JobStatus::Completed,
                    job_id: self.job_id.as_ref().map(|id| format!("{}_{}", id, i)),
                    detail: None,
                },
                JobStatus::Failed => SubmissionOutcome {
                    status: JobStatus::Failed,
                    job_id: None,
                    detail: self.detail.clone(),
                },
            })
            .collect()
    }
}
