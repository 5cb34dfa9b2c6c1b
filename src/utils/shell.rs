//! # POSIX shell 转义工具
//!
//! 按 POSIX 单引号规则转义/还原参数，安全字符串保持原样。
//!
//! ## 依赖关系
//! - 被 `models/task.rs`, `utils/slurm.rs` 使用
//! - 无外部模块依赖

/// 无需转义的字符集
fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c)
}

/// 转义单个参数
pub fn quote(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    if s.chars().all(is_safe_char) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r#"'"'"'"#))
}

/// 还原 `quote` 产生的字符串（支持单引号、双引号与反斜杠）
///
/// 未闭合的引号返回 `None`。
pub fn unquote(s: &str) -> Option<String> {
    let mut out = String::new();
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => loop {
                match chars.next()? {
                    '\'' => break,
                    ch => out.push(ch),
                }
            },
            '"' => loop {
                match chars.next()? {
                    '"' => break,
                    '\\' => out.push(chars.next()?),
                    ch => out.push(ch),
                }
            },
            '\\' => out.push(chars.next()?),
            ch => out.push(ch),
        }
    }

    Some(out)
}
