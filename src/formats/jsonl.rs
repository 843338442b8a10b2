//! # JSON → JSON Lines 转换
//!
//! 把顶层为数组的 JSON 文件改写为每行一个紧凑 JSON 值的 JSONL 文件。
//! 行内分隔符为 `", "` 与 `": "`，对象键顺序与数字原文保持不变。
//!
//! ## 依赖关系
//! - 被 `commands/jsonl.rs` 使用
//! - 使用 `formats/json_array.rs` 读取输入, `utils/fsio.rs` 写出

use super::json_array;
use crate::error::{DocprepError, Result};
use crate::utils::fsio;

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::Serializer;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// 带空格分隔符的单行格式
struct SpacedCompactFormatter;

impl Formatter for SpacedCompactFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// 转换结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSummary {
    pub output: PathBuf,
    pub records: usize,
}

/// 默认输出路径：`.json` 换成 `.jsonl`，否则追加 `.jsonl`
pub fn default_output_path(input: &Path) -> PathBuf {
    let text = input.as_os_str().to_string_lossy();
    match text.strip_suffix(".json") {
        Some(stem) => PathBuf::from(format!("{}.jsonl", stem)),
        None => PathBuf::from(format!("{}.jsonl", text)),
    }
}

/// 把单个值写成一行
pub fn write_line<W: Write, T: Serialize>(writer: &mut W, value: &T) -> io::Result<()> {
    {
        let mut ser = Serializer::with_formatter(&mut *writer, SpacedCompactFormatter);
        value.serialize(&mut ser).map_err(io::Error::from)?;
    }
    writer.write_all(b"\n")
}

/// 执行 JSON → JSONL 转换
pub fn convert_file(input: &Path, output: Option<&Path>) -> Result<ConversionSummary> {
    let items = json_array::read_array(input)?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(input));

    fsio::write_atomic(&output, |writer| {
        for item in &items {
            write_line(writer, item).map_err(|e| DocprepError::FileWriteError {
                path: output.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    })?;

    Ok(ConversionSummary {
        output,
        records: items.len(),
    })
}
