//! # docprep - 扫描文档预处理工具
//!
//! 为文档分类模型准备训练数据，统一成单一可执行文件。
//!
//! ## 子命令
//! - `pdf`    - PDF 前若干页光栅化 + OCR，生成图像/文本对
//! - `encode` - 图像/文本对编码为训练样本 JSON
//! - `jsonl`  - JSON 数组转 JSON Lines
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── batch/     (并行批处理)
//!   │     ├── engines/   (光栅化 / OCR / 编码器)
//!   │     ├── formats/   (JSON / JSONL)
//!   │     └── models/    (数据模型)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod engines;
mod error;
mod formats;
mod models;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&error_chain(&e));
        std::process::exit(1);
    }
}

/// 错误及其来源链，逐层用 ": " 连接
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
