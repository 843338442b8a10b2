//! # encode 命令实现
//!
//! 把 `<input>/<category>/<folder>/<name>.txt` 与同名 `.jpg` 配对，
//! 交给多模态编码器，汇总为一个 JSON 数组训练集。
//!
//! ## 功能
//! - 类别 → 标签由 `LabelMap` 显式给出，未知类别跳过并警告
//! - 缺少配对图像或编码字段不全的样本记为跳过
//! - 编码器报错的样本记为失败，不影响其他样本
//! - 全部完成后一次性写出 JSON（无数据时不写文件）
//!
//! ## 依赖关系
//! - 使用 `cli/encode.rs` 定义的参数
//! - 使用 `batch/` 模块进行并行处理
//! - 使用 `engines/encoder.rs`, `formats/json_array.rs`

use super::print_batch_summary;
use crate::batch::{BatchResult, BatchRunner, FileCollector, ItemTask, ProcessResult};
use crate::cli::encode::EncodeArgs;
use crate::engines::{CommandEncoder, DocumentEncoder, EncoderCommand, PersistentEncoder};
use crate::error::{DocprepError, Result};
use crate::formats::json_array;
use crate::models::labels::LabelMap;
use crate::models::paths::{rewrite_or_display, PathRewrite};
use crate::models::record::{missing_fields, EncodedRecord};
use crate::utils::output;

use anyhow::Context;
use std::fs;
use std::path::Path;

/// 编码任务元数据
#[derive(Debug, Clone, Copy)]
pub struct EncodeMeta {
    pub label: i64,
}

/// 执行 encode 命令
pub fn execute(args: EncodeArgs) -> Result<()> {
    let command = EncoderCommand::parse(&args.encoder, &args.encoder_args)?;
    let timeout = args.batch.timeout();
    let encoder: Box<dyn DocumentEncoder> = if args.persistent {
        Box::new(PersistentEncoder::new(command, args.max_length, timeout))
    } else {
        Box::new(CommandEncoder::new(command, args.max_length, timeout))
    };

    build_dataset(&args, encoder.as_ref()).map(|_| ())
}

/// 枚举、编码并写出训练集，返回写出的记录数
///
/// 没有任何成功记录时不写文件。
pub fn build_dataset(args: &EncodeArgs, encoder: &dyn DocumentEncoder) -> Result<usize> {
    output::print_header("Encoding text/image pairs");

    if !args.input.is_dir() {
        return Err(DocprepError::DirectoryNotFound {
            path: args.input.display().to_string(),
        });
    }

    let labels = args.label_map();
    output::print_info(&format!("Label mapping: {}", labels));

    let tasks = collect_pair_tasks(&args.input, &args.categories, &labels)?;
    if tasks.is_empty() {
        output::print_warning("No .txt files found to encode.");
        return Ok(0);
    }
    output::print_info(&format!("Found {} text files", tasks.len()));

    let runner = BatchRunner::new(args.batch.jobs)
        .with_description("Encoding files")
        .with_max_failures(args.batch.max_failures);
    output::print_info(&format!("Using {} worker(s)", runner.jobs()));

    let mut result = run_encode_batch(&runner, tasks, encoder, args.path_rewrite.as_ref())?;
    print_batch_summary(&result);

    output::print_info(&format!("Processed records: {}", result.payloads.len()));

    if result.payloads.is_empty() {
        output::print_warning("No data found to save.");
        return Ok(0);
    }

    // 完成顺序不确定，按图像路径排序使输出稳定
    result.payloads.sort_by(|a, b| a.imagen.cmp(&b.imagen));
    json_array::write_pretty_array(&args.output, &result.payloads)?;

    output::print_done(&format!(
        "Dataset with {} records written to '{}'",
        result.payloads.len(),
        args.output.display()
    ));

    Ok(result.payloads.len())
}

/// 枚举所有类别下的文本/图像对
///
/// 只扫描类别目录下一级子目录中的 `.txt`，配对图像为同名 `.jpg`。
pub fn collect_pair_tasks(
    input: &Path,
    categories: &[String],
    labels: &LabelMap,
) -> Result<Vec<ItemTask<EncodeMeta>>> {
    let mut tasks = Vec::new();

    for category in categories {
        let category_dir = input.join(category);
        if !category_dir.is_dir() {
            output::print_warning(&format!(
                "Category folder not found, skipping: {}",
                category_dir.display()
            ));
            continue;
        }

        let Some(label) = labels.get(category) else {
            output::print_warning(&format!("Unknown category, skipping: {}", category));
            continue;
        };

        let texts = FileCollector::new(&category_dir)
            .with_pattern("*.txt")?
            .at_depth(2)
            .collect()?;

        for txt in texts {
            let image = txt.with_extension("jpg");
            tasks.push(ItemTask::new(txt, EncodeMeta { label }).with_aux(image));
        }
    }

    Ok(tasks)
}

/// 并行编码
pub fn run_encode_batch(
    runner: &BatchRunner,
    tasks: Vec<ItemTask<EncodeMeta>>,
    encoder: &dyn DocumentEncoder,
    rewrite: Option<&PathRewrite>,
) -> Result<BatchResult<EncodedRecord>> {
    runner.run(tasks, |task| process_pair(task, encoder, rewrite))
}

/// 处理单个文本/图像对
fn process_pair(
    task: &ItemTask<EncodeMeta>,
    encoder: &dyn DocumentEncoder,
    rewrite: Option<&PathRewrite>,
) -> ProcessResult<EncodedRecord> {
    let Some(image) = task.aux(0) else {
        return ProcessResult::Failed(task.id(), "task has no paired image".to_string());
    };

    if !image.is_file() {
        return ProcessResult::Skipped(format!("image not found: {}", image.display()));
    }

    match encode_pair(task.source(), image, task.meta().label, encoder, rewrite) {
        Ok(result) => result,
        Err(e) => ProcessResult::failed(task.id(), &e),
    }
}

fn encode_pair(
    text_path: &Path,
    image: &Path,
    label: i64,
    encoder: &dyn DocumentEncoder,
    rewrite: Option<&PathRewrite>,
) -> anyhow::Result<ProcessResult<EncodedRecord>> {
    let text = fs::read_to_string(text_path)
        .with_context(|| format!("reading {}", text_path.display()))?;

    let encoding = encoder.encode(image, &text).context("encoder call failed")?;

    let missing = missing_fields(&encoding);
    if !missing.is_empty() {
        return Ok(ProcessResult::Skipped(format!(
            "encoding lacks field(s): {}",
            missing.join(", ")
        )));
    }

    let imagen = rewrite_or_display(rewrite, image);
    Ok(EncodedRecord::from_encoding(encoding, label, imagen, text)
        .map(ProcessResult::Success)
        .unwrap_or_else(|| ProcessResult::Skipped("incomplete encoding".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use crate::engines::Encoding;
    use clap::Parser;
    use serde_json::{json, Value};
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    /// 按文本内容决定行为的假编码器
    struct FakeEncoder;

    impl DocumentEncoder for FakeEncoder {
        fn encode(&self, image: &Path, text: &str) -> Result<Encoding> {
            if text.contains("hangs") {
                return Err(DocprepError::CommandTimeout {
                    command: "encoder".to_string(),
                    timeout: std::time::Duration::from_secs(30),
                });
            }
            if text.contains("ValueError") {
                return Err(DocprepError::CommandFailed {
                    command: "encoder".to_string(),
                    stderr: "ValueError: image has no pixels".to_string(),
                });
            }
            let value = if text.contains("partial") {
                json!({"input_ids": [0, 2]})
            } else {
                json!({
                    "input_ids": [0, text.len(), 2],
                    "bbox": [[0, 0, 0, 0]],
                    "pixel_values": [[[0.25]]],
                    "attention_mask": [1, 1, 1],
                    "source": image.display().to_string()
                })
            };
            match value {
                Value::Object(map) => Ok(map),
                _ => unreachable!(),
            }
        }
    }

    fn write_pair(dir: &Path, name: &str, text: &str, with_image: bool) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(format!("{}.txt", name)), text).unwrap();
        if with_image {
            fs::write(dir.join(format!("{}.jpg", name)), b"\xff\xd8").unwrap();
        }
    }

    fn labels() -> LabelMap {
        LabelMap::from_entries(vec!["CV=12".parse().unwrap()])
    }

    fn run(root: &Path, categories: &[&str]) -> BatchResult<EncodedRecord> {
        let categories: Vec<String> = categories.iter().map(|c| c.to_string()).collect();
        let tasks = collect_pair_tasks(root, &categories, &labels()).unwrap();
        run_encode_batch(&BatchRunner::new(2), tasks, &FakeEncoder, None).unwrap()
    }

    #[test]
    fn test_collect_pair_tasks_layout() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_pair(&root.join("CV").join("lote1"), "a", "uno", true);
        write_pair(&root.join("CV").join("lote2"), "b", "dos", false);
        write_pair(&root.join("CV"), "suelto", "ignorado", true);
        write_pair(&root.join("CURP").join("lote1"), "c", "tres", true);

        let categories = vec!["CV".to_string(), "CURP".to_string(), "NADA".to_string()];
        let tasks = collect_pair_tasks(root, &categories, &labels()).unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].source(), root.join("CV").join("lote1").join("a.txt"));
        assert_eq!(
            tasks[0].aux(0),
            Some(root.join("CV").join("lote1").join("a.jpg").as_path())
        );
        assert!(tasks.iter().all(|t| t.meta().label == 12));
    }

    #[test]
    fn test_missing_image_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let lote = dir.path().join("CV").join("lote1");
        write_pair(&lote, "a", "uno", true);
        write_pair(&lote, "b", "dos", false);
        write_pair(&lote, "c", "tres", true);

        let result = run(dir.path(), &["CV"]);

        assert_eq!(result.success, 2);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.failed, 0);
        assert!(result.skips[0].0.ends_with("b.txt"));
        assert!(result.payloads.iter().all(|r| !r.imagen.ends_with("b.jpg")));
    }

    #[test]
    fn test_encoder_error_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let lote = dir.path().join("CV").join("lote1");
        write_pair(&lote, "a", "uno", true);
        write_pair(&lote, "b", "raises ValueError", true);
        write_pair(&lote, "c", "tres", true);

        let result = run(dir.path(), &["CV"]);

        assert_eq!(result.success, 2);
        assert_eq!(result.failed, 1);
        assert!(result.failures[0].0.ends_with("b.txt"));
        assert!(result.failures[0].1.contains("ValueError: image has no pixels"));
    }

    #[test]
    fn test_incomplete_encoding_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let lote = dir.path().join("CV").join("lote1");
        write_pair(&lote, "a", "partial output", true);

        let result = run(dir.path(), &["CV"]);

        assert_eq!(result.skipped, 1);
        assert!(result.skips[0].1.contains("bbox"));
        assert!(result.payloads.is_empty());
    }

    #[test]
    fn test_record_contents_and_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let lote = dir.path().join("CV").join("lote1");
        write_pair(&lote, "a", "Ingeniera en Mérida", true);

        let tasks =
            collect_pair_tasks(dir.path(), &["CV".to_string()], &labels()).unwrap();
        let local = dir.path().display().to_string();
        let rewrite = PathRewrite::new(&local, "/drive/MyDrive");
        let result =
            run_encode_batch(&BatchRunner::new(1), tasks, &FakeEncoder, Some(&rewrite)).unwrap();

        let record = &result.payloads[0];
        assert_eq!(record.label, 12);
        assert_eq!(record.texto, "Ingeniera en Mérida");
        assert_eq!(
            PathBuf::from(&record.imagen),
            Path::new("/drive/MyDrive").join("CV").join("lote1").join("a.jpg")
        );
        assert_eq!(record.attention_mask, json!([1, 1, 1]));
    }

    #[test]
    fn test_repeated_runs_yield_same_set() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..8 {
            let lote = dir.path().join("CV").join(format!("lote{}", i % 3));
            write_pair(&lote, &format!("doc{}", i), &format!("texto {}", i), i % 4 != 0);
        }

        let set = |r: BatchResult<EncodedRecord>| -> BTreeSet<String> {
            r.payloads.into_iter().map(|p| p.imagen).collect()
        };
        let first = set(run(dir.path(), &["CV"]));
        let second = set(run(dir.path(), &["CV"]));
        assert_eq!(first.len(), 6);
        assert_eq!(first, second);
    }

    fn encode_args(input: &Path, output: &Path) -> EncodeArgs {
        let cli = Cli::try_parse_from([
            "docprep",
            "encode",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--encoder",
            "unused",
            "-j",
            "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Encode(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_dataset_is_sorted_by_image_path() {
        let dir = tempfile::tempdir().unwrap();
        let cv = dir.path().join("CV");
        write_pair(&cv.join("lote2"), "z", "zeta", true);
        write_pair(&cv.join("lote1"), "m", "eme", true);
        write_pair(&cv.join("lote1"), "a", "a", true);
        write_pair(&cv.join("lote1"), "b", "sin imagen", false);
        let out = dir.path().join("datos_CV.json");

        let written = build_dataset(&encode_args(dir.path(), &out), &FakeEncoder).unwrap();
        assert_eq!(written, 3);

        let records = json_array::read_array(&out).unwrap();
        let images: Vec<&str> = records
            .iter()
            .map(|r| r["imagen"].as_str().unwrap())
            .collect();
        let mut sorted = images.clone();
        sorted.sort();
        assert_eq!(images, sorted);
        assert!(images[0].ends_with("a.jpg"));
        assert!(images[2].ends_with("z.jpg"));
        assert_eq!(records[0]["label"], 12);
    }

    #[test]
    fn test_no_records_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let lote = dir.path().join("CV").join("lote1");
        write_pair(&lote, "a", "uno", false);
        write_pair(&lote, "b", "partial output", true);
        let out = dir.path().join("datos_CV.json");

        let written = build_dataset(&encode_args(dir.path(), &out), &FakeEncoder).unwrap();

        assert_eq!(written, 0);
        assert!(!out.exists());
    }

    #[test]
    fn test_encoder_timeout_fails_only_that_item() {
        let dir = tempfile::tempdir().unwrap();
        let lote = dir.path().join("CV").join("lote1");
        write_pair(&lote, "a", "uno", true);
        write_pair(&lote, "b", "model hangs", true);
        write_pair(&lote, "c", "tres", true);

        let result = run(dir.path(), &["CV"]);
        assert_eq!(result.success, 2);
        assert_eq!(result.failed, 1);
        assert!(result.failures[0].0.ends_with("b.txt"));
        assert!(result.failures[0].1.contains("timed out after 30s"));

        let out = dir.path().join("datos_CV.json");
        let written = build_dataset(&encode_args(dir.path(), &out), &FakeEncoder).unwrap();
        assert_eq!(written, 2);
        assert!(out.is_file());
    }

    #[test]
    fn test_missing_input_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = encode_args(&dir.path().join("nada"), &dir.path().join("o.json"));
        let err = build_dataset(&args, &FakeEncoder).unwrap_err();
        assert!(matches!(err, DocprepError::DirectoryNotFound { .. }));
    }
}
