//! # 输出记录
//!
//! - `PageRecord`: PDF 单页的 OCR 文本与图像/文本路径
//! - `ManifestRow`: 页面清单 CSV 的一行
//! - `EncodedRecord`: 编码后的训练样本
//!
//! 字段名即 JSON/CSV 中的键名，与下游训练脚本约定一致。
//!
//! ## 依赖关系
//! - 被 `commands/pdf.rs`, `commands/encode.rs` 使用
//! - 使用 `serde` 序列化

use crate::engines::Encoding;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 编码结果中必须存在的字段
pub const REQUIRED_FIELDS: [&str; 4] = ["input_ids", "bbox", "pixel_values", "attention_mask"];

/// PDF 单页记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// OCR 文本
    pub texto: String,
    /// 页面图像路径
    pub imagen: String,
    /// 文本文件路径
    pub txt: String,
}

/// 页面清单行
#[derive(Debug, Clone, Serialize)]
pub struct ManifestRow<'a> {
    pub category: &'a str,
    pub pdf: &'a str,
    pub page: usize,
    pub imagen: &'a str,
    pub txt: &'a str,
}

/// 编码后的训练样本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedRecord {
    pub input_ids: Value,
    pub bbox: Value,
    pub pixel_values: Value,
    pub attention_mask: Value,
    pub label: i64,
    /// 原始图像路径（可能经过改写）
    pub imagen: String,
    /// 原始文本
    pub texto: String,
}

impl EncodedRecord {
    /// 由编码结果构造；缺少任一必需字段时返回 `None`
    pub fn from_encoding(
        mut encoding: Encoding,
        label: i64,
        imagen: String,
        texto: String,
    ) -> Option<Self> {
        let mut take = |key: &str| encoding.remove(key);
        Some(Self {
            input_ids: take("input_ids")?,
            bbox: take("bbox")?,
            pixel_values: take("pixel_values")?,
            attention_mask: take("attention_mask")?,
            label,
            imagen,
            texto,
        })
    }
}

/// 列出编码结果中缺失的必需字段
pub fn missing_fields(encoding: &Encoding) -> Vec<&'static str> {
    REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|key| !encoding.contains_key(*key))
        .collect()
}
