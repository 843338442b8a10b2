//! # 输出格式模块
//!
//! - `json_array`: 数据集 JSON 数组读写
//! - `jsonl`: JSON 数组 → JSON Lines
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用

pub mod json_array;
pub mod jsonl;
