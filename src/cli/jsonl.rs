//! # jsonl 子命令 CLI 定义
//!
//! JSON 数组文件转换为 JSON Lines
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/jsonl.rs`

use clap::Args;
use std::path::PathBuf;

/// jsonl 子命令参数
#[derive(Args, Debug)]
pub struct JsonlArgs {
    /// Input JSON file containing an array
    pub input: PathBuf,

    /// Output JSONL file (default: input with .json replaced by .jsonl)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
