//! # PDF 光栅化
//!
//! 使用 poppler 工具把 PDF 页面渲染为 JPEG：
//! - `pdfinfo` 读取页数
//! - `pdftoppm -singlefile` 逐页渲染
//!
//! ## 依赖关系
//! - 被 `commands/pdf.rs` 使用
//! - 使用 `engines/command.rs` 执行外部命令
//! - 使用 `regex` 解析 pdfinfo 输出

use super::command::ExternalCommand;
use crate::error::{DocprepError, Result};

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

/// PDF 页面光栅化接口
pub trait PageRasterizer: Sync {
    /// PDF 总页数
    fn page_count(&self, pdf: &Path) -> Result<usize>;

    /// 渲染第 `page` 页（从 1 开始）到 `target`（JPEG）
    fn render_page(&self, pdf: &Path, page: usize, target: &Path) -> Result<()>;
}

/// 基于 poppler-utils 的光栅化实现
#[derive(Debug, Clone)]
pub struct PopplerRasterizer {
    /// 渲染分辨率
    dpi: u32,
    timeout: Option<Duration>,
}

impl PopplerRasterizer {
    pub fn new(dpi: u32, timeout: Option<Duration>) -> Self {
        Self { dpi, timeout }
    }
}

impl PageRasterizer for PopplerRasterizer {
    fn page_count(&self, pdf: &Path) -> Result<usize> {
        let stdout = ExternalCommand::new("pdfinfo")
            .arg(pdf)
            .timeout(self.timeout)
            .run()?;
        let text = String::from_utf8_lossy(&stdout);
        parse_pdfinfo_pages(&text).ok_or_else(|| DocprepError::CommandFailed {
            command: format!("pdfinfo {}", pdf.display()),
            stderr: "no 'Pages:' line in output".to_string(),
        })
    }

    fn render_page(&self, pdf: &Path, page: usize, target: &Path) -> Result<()> {
        // -singlefile 不追加页码后缀，输出为 <prefix>.jpg
        let prefix = target.with_extension("");
        ExternalCommand::new("pdftoppm")
            .args(["-jpeg", "-singlefile"])
            .args(["-r".to_string(), self.dpi.to_string()])
            .args(["-f".to_string(), page.to_string()])
            .args(["-l".to_string(), page.to_string()])
            .arg(pdf)
            .arg(&prefix)
            .timeout(self.timeout)
            .run()?;

        let produced = with_jpg_extension(&prefix);
        if produced != target {
            std::fs::rename(&produced, target).map_err(|e| DocprepError::FileWriteError {
                path: target.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }
}

fn with_jpg_extension(prefix: &Path) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(".jpg");
    PathBuf::from(name)
}

/// 从 pdfinfo 输出中提取页数
pub fn parse_pdfinfo_pages(text: &str) -> Option<usize> {
    static PAGES: OnceLock<Regex> = OnceLock::new();
    let re = PAGES.get_or_init(|| Regex::new(r"(?m)^Pages:\s+(\d+)\s*$").unwrap());
    re.captures(text)?.get(1)?.as_str().parse().ok()
}
