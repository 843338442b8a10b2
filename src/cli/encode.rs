//! # encode 子命令 CLI 定义
//!
//! 把图像/文本对编码为训练样本并写出 JSON 数组
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/encode.rs`

use super::BatchArgs;
use crate::models::labels::{LabelEntry, LabelMap};
use crate::models::paths::PathRewrite;

use clap::Args;
use std::path::PathBuf;

/// encode 子命令参数
#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Root directory: <input>/<category>/<folder>/<name>.txt + <name>.jpg
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output JSON file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Categories to process
    #[arg(short, long, value_delimiter = ',', default_value = "CV")]
    pub categories: Vec<String>,

    /// Category label mapping, repeatable (e.g. --label CV=12 --label CURP=3)
    #[arg(short, long = "label", value_name = "NAME=ID", default_value = "CV=12")]
    pub labels: Vec<LabelEntry>,

    /// Encoder command; receives a JSON request on stdin, prints a JSON object.
    /// Split on whitespace without quote handling
    #[arg(short, long, env = "DOCPREP_ENCODER")]
    pub encoder: String,

    /// Extra encoder argument passed verbatim, repeatable (use for paths with spaces)
    #[arg(long = "encoder-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub encoder_args: Vec<String>,

    /// Keep one encoder process per worker and exchange one JSON request per line
    #[arg(long)]
    pub persistent: bool,

    /// Maximum token sequence length passed to the encoder
    #[arg(long, default_value_t = 512)]
    pub max_length: usize,

    /// Rewrite recorded image paths (first occurrence of FROM becomes TO)
    #[arg(long, value_name = "FROM=TO")]
    pub path_rewrite: Option<PathRewrite>,

    #[command(flatten)]
    pub batch: BatchArgs,
}

impl EncodeArgs {
    pub fn label_map(&self) -> LabelMap {
        LabelMap::from_entries(self.labels.iter().cloned())
    }
}
