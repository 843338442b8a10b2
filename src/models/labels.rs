//! # 类别标签映射
//!
//! 类别目录名 → 数值标签。由命令行 `--label NAME=ID` 构造后显式传入枚举逻辑。
//!
//! ## 依赖关系
//! - 被 `cli/encode.rs`（参数解析）与 `commands/encode.rs` 使用

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// 单条 `NAME=ID` 映射
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEntry {
    pub name: String,
    pub id: i64,
}

impl FromStr for LabelEntry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, id) = s
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=ID, got '{}'", s))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("empty category name in '{}'", s));
        }
        let id = id
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("invalid label id in '{}': {}", s, e))?;
        Ok(LabelEntry {
            name: name.to_string(),
            id,
        })
    }
}

/// 类别标签表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    labels: BTreeMap<String, i64>,
}

impl LabelMap {
    /// 由映射条目构造，后出现的同名条目覆盖前者
    pub fn from_entries(entries: impl IntoIterator<Item = LabelEntry>) -> Self {
        Self {
            labels: entries.into_iter().map(|e| (e.name, e.id)).collect(),
        }
    }

    /// 查询类别对应的标签
    pub fn get(&self, category: &str) -> Option<i64> {
        self.labels.get(category).copied()
    }
}

impl fmt::Display for LabelMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .labels
            .iter()
            .map(|(name, id)| format!("{}={}", name, id))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}
