//! # 工具函数模块
//!
//! 提供美化输出、进度条、原子文件写入等工具。
//!
//! ## 依赖关系
//! - 被 `batch/`, `commands/`, `formats/` 模块使用
//! - 子模块: output, progress, fsio

pub mod fsio;
pub mod output;
pub mod progress;
