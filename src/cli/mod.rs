//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `pdf`: PDF 光栅化 + OCR
//! - `encode`: 图像/文本对编码为训练样本
//! - `jsonl`: JSON 数组转 JSON Lines
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: pdf, encode, jsonl

pub mod encode;
pub mod jsonl;
pub mod pdf;

use clap::{Args, Parser, Subcommand};
use std::time::Duration;

/// docprep - 扫描文档预处理工具
#[derive(Parser)]
#[command(name = "docprep")]
#[command(version)]
#[command(about = "Preprocess scanned documents for document classification training", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Rasterize and OCR the first pages of every PDF in each category
    Pdf(pdf::PdfArgs),

    /// Encode paired text/image files into a JSON training dataset
    Encode(encode::EncodeArgs),

    /// Convert a JSON array file to JSON Lines
    Jsonl(jsonl::JsonlArgs),
}

/// 批量处理通用参数
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, default_value_t = 0, env = "DOCPREP_JOBS")]
    pub jobs: usize,

    /// Per-call timeout for external tools, in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Stop starting new items after this many failures (0 = never)
    #[arg(long, default_value_t = 0)]
    pub max_failures: usize,
}

impl BatchArgs {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}
