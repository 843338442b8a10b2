//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `batch/`, `engines/`, `formats/`, `models/`, `utils/`
//! - 子模块: pdf, encode, jsonl

pub mod encode;
pub mod jsonl;
pub mod pdf;

use crate::batch::BatchResult;
use crate::cli::Commands;
use crate::error::Result;
use crate::utils::output;

use tabled::{Table, Tabled};

/// 最多列出的失败条目数
const MAX_LISTED_FAILURES: usize = 10;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Pdf(args) => pdf::execute(args),
        Commands::Encode(args) => encode::execute(args),
        Commands::Jsonl(args) => jsonl::execute(args),
    }
}

/// 批量统计行
#[derive(Debug, Clone, Tabled)]
struct SummaryRow {
    #[tabled(rename = "Outcome")]
    outcome: &'static str,
    #[tabled(rename = "Items")]
    count: usize,
}

fn summary_rows<P>(result: &BatchResult<P>) -> Vec<SummaryRow> {
    vec![
        SummaryRow {
            outcome: "success",
            count: result.success,
        },
        SummaryRow {
            outcome: "skipped",
            count: result.skipped,
        },
        SummaryRow {
            outcome: "failed",
            count: result.failed,
        },
        SummaryRow {
            outcome: "total",
            count: result.total(),
        },
    ]
}

/// 打印批量处理统计与失败列表
pub fn print_batch_summary<P>(result: &BatchResult<P>) {
    output::print_separator();
    output::print_success(&format!(
        "Batch complete: {}/{} items, {} success, {} skipped, {} failed",
        result.completed, result.submitted, result.success, result.skipped, result.failed
    ));
    println!("{}", Table::new(summary_rows(result)));

    if !result.failures.is_empty() {
        output::print_warning("Failed items:");
        for (id, err) in result.failures.iter().take(MAX_LISTED_FAILURES) {
            output::print_error(&format!("  {}: {}", id, err));
        }
        if result.failures.len() > MAX_LISTED_FAILURES {
            output::print_warning(&format!(
                "  ... and {} more",
                result.failures.len() - MAX_LISTED_FAILURES
            ));
        }
    }
}
