//! # 数据模型模块
//!
//! ## 依赖关系
//! - 被 `cli/`, `commands/` 使用
//! - 子模块: labels (类别标签表), paths (路径改写), record (输出记录)

pub mod labels;
pub mod paths;
pub mod record;
