//! # 批量执行器
//!
//! 并行执行批量处理任务。
//!
//! ## 功能
//! - 基于 rayon 的固定大小线程池
//! - 进度条显示
//! - 单任务错误隔离（包括 panic）
//! - 可选的协作式取消
//! - 错误收集与汇总报告
//!
//! ## 依赖关系
//! - 被 `commands/pdf.rs`, `commands/encode.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `batch/sink.rs` 汇集结果

use super::sink::{ProgressState, ResultSink};
use super::task::{ItemTask, ProcessResult};
use crate::error::Result;
use crate::utils::{output, progress};

use rayon::prelude::*;
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Once};

thread_local! {
    /// 当前线程是否正在执行任务处理器
    static IN_TASK: Cell<bool> = const { Cell::new(false) };
}

static QUIET_TASK_PANICS: Once = Once::new();

/// 任务内的 panic 由 `run_one` 转成失败结果并经进度条输出，
/// 这里只屏蔽默认钩子的 stderr 打印，任务外的 panic 照常交给原钩子
fn install_panic_hook() {
    QUIET_TASK_PANICS.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !IN_TASK.with(Cell::get) {
                previous(info);
            }
        }));
    });
}

/// 取消信号
///
/// 取消后尚未开始的任务直接记为跳过，正在执行的任务照常完成。
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 批量处理结果
#[derive(Debug)]
pub struct BatchResult<P> {
    /// 成功结果（顺序不保证与输入一致）
    pub payloads: Vec<P>,
    /// 成功数量
    pub success: usize,
    /// 跳过数量
    pub skipped: usize,
    /// 失败数量
    pub failed: usize,
    /// 跳过详情 (任务标识, 原因)
    pub skips: Vec<(String, String)>,
    /// 失败详情 (任务标识, 错误信息)
    pub failures: Vec<(String, String)>,
    /// 提交的任务数
    pub submitted: usize,
    /// 结束时已完成的任务数
    pub completed: usize,
}

impl<P> Default for BatchResult<P> {
    fn default() -> Self {
        Self {
            payloads: Vec::new(),
            success: 0,
            skipped: 0,
            failed: 0,
            skips: Vec::new(),
            failures: Vec::new(),
            submitted: 0,
            completed: 0,
        }
    }
}

impl<P> BatchResult<P> {
    /// 合并单个任务的结果统计（成功负载由 `ResultSink` 另行汇集）
    fn merge(&mut self, result: TaskReport) {
        match result {
            TaskReport::Success => self.success += 1,
            TaskReport::Skipped(id, reason) => {
                self.skipped += 1;
                self.skips.push((id, reason));
            }
            TaskReport::Failed(id, err) => {
                self.failed += 1;
                self.failures.push((id, err));
            }
        }
    }

    /// 总处理数量
    pub fn total(&self) -> usize {
        self.success + self.skipped + self.failed
    }
}

/// 去掉负载后的单任务结果
enum TaskReport {
    Success,
    Skipped(String, String),
    Failed(String, String),
}

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
    /// 进度条描述
    description: String,
    cancel: Option<CancelToken>,
    /// 失败数达到该值后取消剩余任务（0 = 不限制）
    max_failures: usize,
}

impl BatchRunner {
    /// 创建新的批量执行器（`jobs == 0` 表示使用全部 CPU）
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self {
            jobs,
            description: "Processing".to_string(),
            cancel: None,
            max_failures: 0,
        }
    }

    /// 设置进度条描述
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// 绑定取消信号
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// 失败数达到 `limit` 后停止启动新任务（0 = 不限制）
    pub fn with_max_failures(mut self, limit: usize) -> Self {
        self.max_failures = limit;
        if limit > 0 && self.cancel.is_none() {
            return self.with_cancel(CancelToken::new());
        }
        self
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// 并行处理任务列表
    ///
    /// 所有任务都产生结果后才返回。只有线程池创建失败会返回错误。
    pub fn run<M, P, F>(&self, tasks: Vec<ItemTask<M>>, processor: F) -> Result<BatchResult<P>>
    where
        M: Sync,
        P: Send,
        F: Fn(&ItemTask<M>) -> ProcessResult<P> + Sync + Send,
    {
        install_panic_hook();

        let state = ProgressState::new(tasks.len());
        let pb = progress::create_progress_bar(state.total() as u64, &self.description);
        let sink = ResultSink::new();
        let failures = AtomicUsize::new(0);

        // 配置 rayon 线程池
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()?;

        let reports: Vec<TaskReport> = pool.install(|| {
            tasks
                .par_iter()
                .map(|task| {
                    let report = match self.run_one(task, &processor) {
                        ProcessResult::Success(payload) => {
                            sink.add(payload);
                            TaskReport::Success
                        }
                        ProcessResult::Skipped(reason) => {
                            pb.suspend(|| {
                                output::print_skip(&format!("{}: {}", task.id(), reason));
                            });
                            TaskReport::Skipped(task.id(), reason)
                        }
                        ProcessResult::Failed(id, err) => {
                            pb.suspend(|| {
                                output::print_error(&format!("{}: {}", id, err));
                            });
                            self.note_failure(&failures);
                            TaskReport::Failed(id, err)
                        }
                    };

                    state.advance();
                    pb.inc(1);
                    report
                })
                .collect()
        });

        pb.finish_and_clear();

        // 汇总结果
        let mut batch_result = BatchResult::default();
        for report in reports {
            batch_result.merge(report);
        }
        batch_result.payloads = sink.finalize();
        batch_result.submitted = state.total();
        batch_result.completed = state.completed();

        Ok(batch_result)
    }

    /// 记录一次失败，必要时触发取消
    fn note_failure(&self, failures: &AtomicUsize) {
        let count = failures.fetch_add(1, Ordering::SeqCst) + 1;
        if self.max_failures > 0 && count >= self.max_failures {
            if let Some(token) = &self.cancel {
                token.cancel();
            }
        }
    }

    /// 执行单个任务，在任务边界捕获 panic
    fn run_one<M, P, F>(&self, task: &ItemTask<M>, processor: &F) -> ProcessResult<P>
    where
        F: Fn(&ItemTask<M>) -> ProcessResult<P>,
    {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return ProcessResult::Skipped("cancelled".to_string());
        }

        IN_TASK.with(|flag| flag.set(true));
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| processor(task)));
        IN_TASK.with(|flag| flag.set(false));

        match outcome {
            Ok(result) => result,
            Err(payload) => ProcessResult::Failed(task.id(), panic_message(payload.as_ref())),
        }
    }
}

/// 提取 panic 负载中的消息
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {}", msg)
    } else {
        "panicked".to_string()
    }
}
