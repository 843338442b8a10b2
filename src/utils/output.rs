//! # 终端输出工具
//!
//! 统一的带标签输出：`[OK]`, `[ERR]`, `[WARN]`, `[*]`, `[SKIP]`, `[DONE]`。
//! 错误与警告写入 stderr，其余写入 stdout，方便把正常输出重定向到文件。
//!
//! ## 依赖关系
//! - 被 `batch/` 与所有 `commands/` 模块使用
//! - 使用 `colored` crate

use colored::{ColoredString, Colorize};

/// 消息级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
    Warning,
    Info,
    Skip,
    Done,
}

impl Level {
    fn tag(self) -> ColoredString {
        match self {
            Level::Success => "[OK]".green().bold(),
            Level::Error => "[ERR]".red().bold(),
            Level::Warning => "[WARN]".yellow().bold(),
            Level::Info => "[*]".blue().bold(),
            Level::Skip => "[SKIP]".dimmed(),
            Level::Done => "[DONE]".green().bold(),
        }
    }

    fn to_stderr(self) -> bool {
        matches!(self, Level::Error | Level::Warning)
    }
}

/// 按级别打印一行
pub fn print(level: Level, msg: &str) {
    if level.to_stderr() {
        eprintln!("{} {}", level.tag(), msg);
    } else {
        println!("{} {}", level.tag(), msg);
    }
}

pub fn print_success(msg: &str) {
    print(Level::Success, msg);
}

pub fn print_error(msg: &str) {
    print(Level::Error, msg);
}

pub fn print_warning(msg: &str) {
    print(Level::Warning, msg);
}

pub fn print_info(msg: &str) {
    print(Level::Info, msg);
}

/// 打印跳过的任务（策略结果，不是错误）
pub fn print_skip(msg: &str) {
    print(Level::Skip, msg);
}

pub fn print_done(msg: &str) {
    print(Level::Done, msg);
}

/// 打印 输入 -> 输出
pub fn print_conversion(from: &str, to: &str) {
    println!(
        "{} {} {} {}",
        Level::Success.tag(),
        from.dimmed(),
        "->".cyan(),
        to
    );
}

/// 打印标题栏
pub fn print_header(title: &str) {
    println!("\n{}", rule());
    println!("  {}", title.bold());
    println!("{}\n", rule());
}

/// 打印分隔线
pub fn print_separator() {
    println!("{}", rule());
}

fn rule() -> ColoredString {
    "─".repeat(60).dimmed()
}
