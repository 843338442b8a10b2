//! # 结果汇集器与进度计数
//!
//! - `ResultSink`: 多个工作线程并发写入成功结果
//! - `ProgressState`: 已完成/总数计数，仅用于报告
//!
//! ## 依赖关系
//! - 被 `batch/runner.rs` 使用

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// 成功结果汇集器
#[derive(Debug, Default)]
pub struct ResultSink<P> {
    items: Mutex<Vec<P>>,
}

impl<P> ResultSink<P> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    /// 添加一个成功结果，可在任意工作线程中调用
    pub fn add(&self, payload: P) {
        // 某个任务在持锁时 panic 不应丢掉其他任务的结果
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.push(payload);
    }

    /// 取出全部结果（消耗自身，只能调用一次）
    pub fn finalize(self) -> Vec<P> {
        self.items.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

/// 进度计数
#[derive(Debug)]
pub struct ProgressState {
    completed: AtomicUsize,
    total: usize,
}

impl ProgressState {
    pub fn new(total: usize) -> Self {
        Self {
            completed: AtomicUsize::new(0),
            total,
        }
    }

    /// 记录一个任务完成，返回新的完成数
    pub fn advance(&self) -> usize {
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total
    }
}
