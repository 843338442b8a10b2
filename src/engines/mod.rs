//! # 外部引擎模块
//!
//! 光栅化、OCR、多模态编码都由外部程序完成，这里只定义接口
//! 并提供基于命令行工具的实现。测试中用假实现替换。
//!
//! ## 依赖关系
//! - 被 `commands/pdf.rs`, `commands/encode.rs` 使用
//! - 子模块: command, raster, ocr, encoder

pub mod command;
pub mod encoder;
pub mod ocr;
pub mod raster;

pub use encoder::{CommandEncoder, DocumentEncoder, EncoderCommand, Encoding, PersistentEncoder};
pub use ocr::{OcrEngine, TesseractOcr};
pub use raster::{PageRasterizer, PopplerRasterizer};
