//! # JSON 数组读写
//!
//! - 写: 4 空格缩进、保留非 ASCII 字符的 JSON 数组，整体写入（不会留下半个文件）
//! - 读: 读取顶层必须为数组的 JSON 文件
//!
//! ## 依赖关系
//! - 被 `commands/encode.rs`, `formats/jsonl.rs` 使用
//! - 使用 `serde_json`, `utils/fsio.rs`

use crate::error::{DocprepError, Result};
use crate::utils::fsio;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Serializer, Value};
use std::path::Path;

/// 以 4 空格缩进写出 JSON 数组
pub fn write_pretty_array<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    fsio::write_atomic(path, |writer| {
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut ser = Serializer::with_formatter(writer, formatter);
        items
            .serialize(&mut ser)
            .map_err(|e| DocprepError::JsonWriteError {
                path: path.display().to_string(),
                source: e,
            })
    })
}

/// 读取 JSON 数组文件
pub fn read_array(path: &Path) -> Result<Vec<Value>> {
    let content = fsio::read_to_string(path)?;
    let value: Value =
        serde_json::from_str(&content).map_err(|e| DocprepError::JsonReadError {
            path: path.display().to_string(),
            source: e,
        })?;

    match value {
        Value::Array(items) => Ok(items),
        _ => Err(DocprepError::InvalidJsonShape {
            path: path.display().to_string(),
            reason: "input JSON must contain an array of objects".to_string(),
        }),
    }
}
