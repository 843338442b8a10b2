//! # pdf 子命令 CLI 定义
//!
//! PDF 光栅化 + OCR，生成逐页的图像/文本对
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/pdf.rs`

use super::BatchArgs;
use clap::Args;
use std::path::PathBuf;

/// pdf 子命令参数
#[derive(Args, Debug)]
pub struct PdfArgs {
    /// Root directory containing one folder of PDFs per category
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output root; pages land in <output>/<category>/<pdf name>/
    #[arg(short, long)]
    pub output: PathBuf,

    /// Categories (sub-folders of the input root) to process
    #[arg(short, long, value_delimiter = ',', default_value = "CONPROB")]
    pub categories: Vec<String>,

    /// Maximum number of leading pages rendered per PDF
    #[arg(long, default_value_t = 5)]
    pub max_pages: usize,

    /// Rendering resolution in DPI
    #[arg(long, default_value_t = 200)]
    pub dpi: u32,

    /// Tesseract language model
    #[arg(long, default_value = "spa")]
    pub lang: String,

    #[command(flatten)]
    pub batch: BatchArgs,

    /// Do not write <output>/manifest.csv
    #[arg(long, default_value_t = false)]
    pub no_manifest: bool,
}
