//! # 统一错误处理模块
//!
//! 定义 docprep 的所有错误类型，使用 `thiserror` 派生。
//!
//! 单个任务内部的错误不会走到这里：处理器里用 `anyhow` 携带上下文，
//! 由 `batch::runner` 在任务边界转换为 `ProcessResult::Failed`。
//! 这里只描述会终止一次调用的准备阶段错误。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// docprep 统一错误类型
#[derive(Error, Debug)]
pub enum DocprepError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 序列化错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid JSON in {path}")]
    JsonReadError {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize JSON to {path}")]
    JsonWriteError {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected JSON shape in {path}: {reason}")]
    InvalidJsonShape { path: String, reason: String },

    #[error("CSV error")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 外部命令错误
    // ─────────────────────────────────────────────────────────────
    #[error("External command '{command}' not found in PATH")]
    CommandNotFound { command: String },

    #[error("External command failed: {command}\n{stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("External command timed out after {timeout:?}: {command}")]
    CommandTimeout {
        command: String,
        timeout: std::time::Duration,
    },

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to build worker pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, DocprepError>;
