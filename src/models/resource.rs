//! # Slurm 资源请求数据模型
//!
//! `ResourceSpec` 是有序的 `(指令名, 值)` 列表，由配置层显式构建，
//! 脚本编译器按顺序渲染为 `#SBATCH` 行。
//!
//! ## 依赖关系
//! - 被 `config.rs` 构建
//! - 被 `utils/slurm.rs` 渲染

use serde::{Deserialize, Serialize};

/// 单个指令的取值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectiveValue {
    /// 仅出现即可的开关，渲染为 `--key`
    Flag,
    /// 字符串值
    Str(String),
    /// 整数值
    Int(i64),
}

impl std::fmt::Display for DirectiveValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirectiveValue::Flag => Ok(()),
            DirectiveValue::Str(s) => write!(f, "{}", s),
            DirectiveValue::Int(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for DirectiveValue {
    fn from(s: &str) -> Self {
        DirectiveValue::Str(s.to_string())
    }
}

impl From<String> for DirectiveValue {
    fn from(s: String) -> Self {
        DirectiveValue::Str(s)
    }
}

impl From<i64> for DirectiveValue {
    fn from(n: i64) -> Self {
        DirectiveValue::Int(n)
    }
}

impl From<u32> for DirectiveValue {
    fn from(n: u32) -> Self {
        DirectiveValue::Int(n as i64)
    }
}

/// 有序的调度器资源请求
///
/// 名称使用下划线形式（`cpus_per_task`），渲染时才转换为连字符。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSpec {
    entries: Vec<(String, DirectiveValue)>,
}

impl ResourceSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加或原位替换一个指令；`None` 不会被记录
    pub fn set<V: Into<DirectiveValue>>(&mut self, name: &str, value: Option<V>) {
        let Some(value) = value else {
            return;
        };
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// 链式版本的 `set`，用于从已有 spec 派生新 spec
    pub fn with<V: Into<DirectiveValue>>(mut self, name: &str, value: V) -> Self {
        self.set(name, Some(value));
        self
    }

    /// 派生一个去掉指定指令的新 spec
    pub fn without(mut self, names: &[&str]) -> Self {
        self.entries.retain(|(k, _)| !names.contains(&k.as_str()));
        self
    }

    /// 派生一个把指定指令放在最前面的新 spec（已存在的同名项被移除）
    pub fn prepend(self, head: Vec<(String, DirectiveValue)>) -> Self {
        let names: Vec<&str> = head.iter().map(|(k, _)| k.as_str()).collect();
        let rest = self.without(&names);
        let mut entries = head;
        entries.extend(rest.entries);
        ResourceSpec { entries }
    }

    pub fn get(&self, name: &str) -> Option<&DirectiveValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DirectiveValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_skips_none() {
        let mut spec = ResourceSpec::new();
        spec.set("nodes", Some(2u32));
        spec.set::<String>("mem", None);
        assert_eq!(spec.len(), 1);
        assert!(!spec.contains("mem"));
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut spec = ResourceSpec::new();
        spec.set("partition", Some("cpu"));
        spec.set("nodes", Some(1u32));
        spec.set("partition", Some("gpu"));

        let names: Vec<&str> = spec.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["partition", "nodes"]);
        assert_eq!(spec.get("partition"), Some(&DirectiveValue::Str("gpu".into())));
    }

    #[test]
    fn test_derivation_leaves_original_untouched() {
        let base = ResourceSpec::new().with("partition", "cpu").with("output", "x.out");
        let derived = base
            .clone()
            .without(&["output"])
            .prepend(vec![("job_name".to_string(), "sweep".into())]);

        assert!(base.contains("output"));
        assert!(!base.contains("job_name"));

        let names: Vec<&str> = derived.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["job_name", "partition"]);
    }
}
