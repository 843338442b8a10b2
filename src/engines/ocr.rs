//! # OCR 引擎
//!
//! 调用 `tesseract <image> stdout -l <lang>` 识别图像文字。
//!
//! ## 依赖关系
//! - 被 `commands/pdf.rs` 使用
//! - 使用 `engines/command.rs` 执行外部命令

use super::command::ExternalCommand;
use crate::error::Result;

use std::path::Path;
use std::time::Duration;

/// OCR 接口
pub trait OcrEngine: Sync {
    /// 识别图像中的文字
    fn recognize(&self, image: &Path) -> Result<String>;
}

/// Tesseract 命令行实现
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    /// 语言模型，如 "spa"
    lang: String,
    timeout: Option<Duration>,
}

impl TesseractOcr {
    pub fn new(lang: &str, timeout: Option<Duration>) -> Self {
        Self {
            lang: lang.to_string(),
            timeout,
        }
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &Path) -> Result<String> {
        let stdout = ExternalCommand::new("tesseract")
            .arg(image)
            .args(["stdout", "-l", self.lang.as_str()])
            .timeout(self.timeout)
            .run()?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}
