//! # 任务描述存储
//!
//! 把一个批次的全部任务描述写成单个 JSON 文件
//! `<batch_dir>/<array_name>_array_config.json`，供数组成员在另一个进程中
//! 仅凭路径和序号读取。
//!
//! 写入先落到同目录的临时文件，再整体 rename，保证读取方看不到半截文件。
//!
//! ## 依赖关系
//! - 被 `batch/launcher.rs` 写入
//! - 被 `commands/lookup.rs` 读取
//! - 使用 `serde_json`

use crate::error::{LauncherError, Result};
use crate::models::{TaskDescriptor, TaskRecord};

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// 已写入的存储文件句柄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreHandle {
    path: PathBuf,
    size: usize,
}

impl StoreHandle {
    /// 打开已有的存储文件
    pub fn open(path: &Path) -> Result<Self> {
        let records = read_records(path)?;
        Ok(StoreHandle {
            path: path.to_path_buf(),
            size: records.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// 按序号读取单个任务记录
    pub fn lookup(&self, index: usize) -> Result<TaskRecord> {
        lookup(&self.path, index)
    }
}

/// 存储文件位置
pub fn store_path(batch_dir: &Path, array_name: &str) -> PathBuf {
    batch_dir.join(format!("{}_array_config.json", array_name))
}

/// 写入任务描述，返回句柄
pub fn write(batch_dir: &Path, array_name: &str, descriptors: &[TaskDescriptor]) -> Result<StoreHandle> {
    let path = store_path(batch_dir, array_name);
    let records: Vec<TaskRecord> = descriptors.iter().map(TaskDescriptor::to_record).collect();

    let payload = serde_json::to_vec(&records).map_err(|e| LauncherError::StoreWriteError {
        path: path.display().to_string(),
        source: e.into(),
    })?;

    let tmp_path = batch_dir.join(format!(".{}_array_config.json.tmp", array_name));
    let write_err = |e: std::io::Error| LauncherError::StoreWriteError {
        path: path.display().to_string(),
        source: e,
    };

    let result = File::create(&tmp_path)
        .and_then(|mut file| {
            file.write_all(&payload)?;
            file.sync_all()
        })
        .and_then(|_| fs::rename(&tmp_path, &path));

    if let Err(e) = result {
        fs::remove_file(&tmp_path).ok();
        return Err(write_err(e));
    }

    tracing::debug!(path = %path.display(), tasks = records.len(), "task store written");

    Ok(StoreHandle {
        path,
        size: records.len(),
    })
}

fn read_records(path: &Path) -> Result<Vec<TaskRecord>> {
    let content = fs::read(path).map_err(|e| LauncherError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_json::from_slice(&content).map_err(|e| LauncherError::StoreParseError {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// 从存储文件中读取序号为 `index` 的记录
///
/// 序号超出 `[0, size)` 时返回 `TaskNotFound`，与记录内容无关。
pub fn lookup(path: &Path, index: usize) -> Result<TaskRecord> {
    let records = read_records(path)?;
    let size = records.len();
    records
        .into_iter()
        .nth(index)
        .ok_or(LauncherError::TaskNotFound { index, size })
}
