//! # 路径改写
//!
//! 记录到输出中的路径可以与本地处理路径不同（例如本地挂载点与云盘路径）。
//! `FROM=TO` 把路径中第一次出现的 `FROM` 替换为 `TO`。
//!
//! ## 依赖关系
//! - 被 `cli/encode.rs` 与 `commands/encode.rs` 使用

use std::path::Path;
use std::str::FromStr;

/// 路径前缀改写规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRewrite {
    from: String,
    to: String,
}

impl PathRewrite {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// 改写路径文本；不含 `from` 时原样返回
    pub fn apply(&self, path: &Path) -> String {
        path.display().to_string().replacen(&self.from, &self.to, 1)
    }
}

impl FromStr for PathRewrite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .split_once('=')
            .ok_or_else(|| format!("expected FROM=TO, got '{}'", s))?;
        if from.is_empty() {
            return Err(format!("empty FROM in '{}'", s));
        }
        Ok(Self::new(from, to))
    }
}

/// 可选改写
pub fn rewrite_or_display(rewrite: Option<&PathRewrite>, path: &Path) -> String {
    match rewrite {
        Some(r) => r.apply(path),
        None => path.display().to_string(),
    }
}
