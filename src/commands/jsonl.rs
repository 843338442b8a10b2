//! # jsonl 命令实现
//!
//! 把 JSON 数组文件转换为 JSON Lines。
//!
//! ## 依赖关系
//! - 使用 `cli/jsonl.rs` 定义的参数
//! - 使用 `formats/jsonl.rs`

use crate::cli::jsonl::JsonlArgs;
use crate::error::Result;
use crate::formats::jsonl;
use crate::utils::output;

/// 执行 jsonl 命令
pub fn execute(args: JsonlArgs) -> Result<()> {
    let summary = jsonl::convert_file(&args.input, args.output.as_deref())?;

    output::print_conversion(
        &args.input.display().to_string(),
        &summary.output.display().to_string(),
    );
    output::print_done(&format!(
        "Converted {} JSON value(s) to JSONL",
        summary.records
    ));

    Ok(())
}
