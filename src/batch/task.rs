//! # 任务与处理结果模型
//!
//! 一个 `ItemTask` 描述一次处理单元（一个文件或一份 PDF），
//! 一个 `ProcessResult` 是它唯一的处理结果。
//!
//! ## 依赖关系
//! - 被 `batch/runner.rs` 与各 `commands/` 模块使用

use std::path::{Path, PathBuf};

/// 单个处理任务
///
/// 枚举阶段构造完成后不再修改；工作线程只读借用它。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTask<M> {
    /// 源文件路径（同时作为任务标识）
    source: PathBuf,
    /// 附属路径（如配对的图像、输出目录）
    aux: Vec<PathBuf>,
    /// 处理器需要的标签/元数据
    meta: M,
}

impl<M> ItemTask<M> {
    /// 创建新任务
    pub fn new(source: impl Into<PathBuf>, meta: M) -> Self {
        Self {
            source: source.into(),
            aux: Vec::new(),
            meta,
        }
    }

    /// 追加一个附属路径
    pub fn with_aux(mut self, path: impl Into<PathBuf>) -> Self {
        self.aux.push(path.into());
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// 第 `index` 个附属路径
    pub fn aux(&self, index: usize) -> Option<&Path> {
        self.aux.get(index).map(PathBuf::as_path)
    }

    pub fn meta(&self) -> &M {
        &self.meta
    }

    /// 任务标识，用于日志与失败报告
    pub fn id(&self) -> String {
        self.source.display().to_string()
    }
}

/// 单个任务处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessResult<P> {
    /// 处理成功
    Success(P),
    /// 跳过（如配对文件缺失），属于策略结果而非错误
    Skipped(String),
    /// 处理失败
    Failed(String, String), // (任务标识, 错误信息)
}

impl<P> ProcessResult<P> {
    /// 由处理器内部错误构造失败结果，错误链用 `{:#}` 展开到一行
    pub fn failed(id: String, error: &anyhow::Error) -> Self {
        ProcessResult::Failed(id, format!("{:#}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_task_accessors() {
        let task = ItemTask::new("/data/a.txt", 12).with_aux("/data/a.jpg");
        assert_eq!(task.id(), "/data/a.txt");
        assert_eq!(task.aux(0), Some(Path::new("/data/a.jpg")));
        assert_eq!(task.aux(1), None);
        assert_eq!(*task.meta(), 12);
    }

    #[test]
    fn test_failed_flattens_context_chain() {
        let err = Err::<(), _>(anyhow::anyhow!("bad value"))
            .context("encoding t")
            .unwrap_err();
        let result: ProcessResult<()> = ProcessResult::failed("t".to_string(), &err);
        assert_eq!(
            result,
            ProcessResult::Failed("t".to_string(), "encoding t: bad value".to_string())
        );
    }
}
