//! # pdf 命令实现
//!
//! 把每个类别目录下的 PDF 前若干页渲染为 JPEG，并 OCR 为同名 .txt。
//!
//! ## 功能
//! - 按类别收集 `<input>/<category>/*.pdf`
//! - 每份 PDF 一个任务，输出到 `<output>/<category>/<pdf 名>/`
//! - 页面文件命名 `<pdf 名>_pagina_<n>.jpg` / `.txt`
//! - 可选写出页面清单 `manifest.csv`
//!
//! ## 依赖关系
//! - 使用 `cli/pdf.rs` 定义的参数
//! - 使用 `batch/` 模块进行并行处理
//! - 使用 `engines/` 的光栅化与 OCR 实现

use super::print_batch_summary;
use crate::batch::{BatchResult, BatchRunner, FileCollector, ItemTask, ProcessResult};
use crate::cli::pdf::PdfArgs;
use crate::engines::{OcrEngine, PageRasterizer, PopplerRasterizer, TesseractOcr};
use crate::error::{DocprepError, Result};
use crate::models::record::{ManifestRow, PageRecord};
use crate::utils::{fsio, output};

use anyhow::Context;
use std::fs;
use std::io::Write;
use std::path::Path;

const MANIFEST_NAME: &str = "manifest.csv";

/// PDF 任务元数据
#[derive(Debug, Clone)]
pub struct PdfMeta {
    pub category: String,
}

/// 单份 PDF 的处理结果
#[derive(Debug, Clone)]
pub struct PdfPages {
    pub category: String,
    pub pdf: String,
    pub pages: Vec<PageRecord>,
}

/// 执行 pdf 命令
pub fn execute(args: PdfArgs) -> Result<()> {
    let rasterizer = PopplerRasterizer::new(args.dpi, args.batch.timeout());
    let ocr = TesseractOcr::new(&args.lang, args.batch.timeout());

    extract_dataset(&args, &rasterizer, &ocr).map(|_| ())
}

/// 枚举 PDF、逐页渲染识别并写出清单，返回提取的总页数
pub fn extract_dataset(
    args: &PdfArgs,
    rasterizer: &dyn PageRasterizer,
    ocr: &dyn OcrEngine,
) -> Result<usize> {
    output::print_header("Rasterizing and OCR-ing PDFs");

    if !args.input.is_dir() {
        return Err(DocprepError::DirectoryNotFound {
            path: args.input.display().to_string(),
        });
    }
    if args.max_pages == 0 {
        return Err(DocprepError::InvalidArgument(
            "--max-pages must be at least 1".to_string(),
        ));
    }

    fsio::ensure_dir(&args.output)?;

    let tasks = collect_pdf_tasks(&args.input, &args.output, &args.categories)?;
    if tasks.is_empty() {
        output::print_warning(&format!(
            "No PDF files found under '{}'",
            args.input.display()
        ));
        return Ok(0);
    }

    output::print_info(&format!("Found {} PDF files", tasks.len()));
    output::print_info(&format!(
        "Rendering up to {} page(s) per PDF at {} DPI, OCR language '{}'",
        args.max_pages, args.dpi, args.lang
    ));

    let runner = BatchRunner::new(args.batch.jobs)
        .with_description("Processing PDFs")
        .with_max_failures(args.batch.max_failures);
    output::print_info(&format!("Using {} worker(s)", runner.jobs()));

    let result = run_pdf_batch(&runner, tasks, rasterizer, ocr, args.max_pages)?;
    print_batch_summary(&result);

    let page_count: usize = result.payloads.iter().map(|p| p.pages.len()).sum();

    if !args.no_manifest && page_count > 0 {
        let manifest = args.output.join(MANIFEST_NAME);
        write_manifest(&manifest, &result.payloads)?;
        output::print_success(&format!("Manifest written to '{}'", manifest.display()));
    }

    output::print_done(&format!(
        "Extracted {} page(s) from {} PDF(s) into '{}'",
        page_count,
        result.success,
        args.output.display()
    ));

    Ok(page_count)
}

/// 收集所有类别下的 PDF 并创建各自的输出目录
pub fn collect_pdf_tasks(
    input: &Path,
    output_root: &Path,
    categories: &[String],
) -> Result<Vec<ItemTask<PdfMeta>>> {
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

        let pdfs = FileCollector::new(&category_dir)
            .with_pattern("*.pdf")?
            .collect()?;

        for pdf in pdfs {
            let stem = file_stem(&pdf);
            let pdf_output = output_root.join(category).join(&stem);
            fsio::ensure_dir(&pdf_output)?;

            tasks.push(
                ItemTask::new(pdf, PdfMeta {
                    category: category.clone(),
                })
                .with_aux(pdf_output),
            );
        }
    }

    Ok(tasks)
}

/// 并行处理 PDF 任务
pub fn run_pdf_batch(
    runner: &BatchRunner,
    tasks: Vec<ItemTask<PdfMeta>>,
    rasterizer: &dyn PageRasterizer,
    ocr: &dyn OcrEngine,
    max_pages: usize,
) -> Result<BatchResult<PdfPages>> {
    runner.run(tasks, |task| process_pdf(task, rasterizer, ocr, max_pages))
}

/// 处理单份 PDF
fn process_pdf(
    task: &ItemTask<PdfMeta>,
    rasterizer: &dyn PageRasterizer,
    ocr: &dyn OcrEngine,
    max_pages: usize,
) -> ProcessResult<PdfPages> {
    let Some(out_dir) = task.aux(0) else {
        return ProcessResult::Failed(task.id(), "task has no output folder".to_string());
    };

    match extract_pages(task.source(), out_dir, rasterizer, ocr, max_pages) {
        Ok(pages) => ProcessResult::Success(PdfPages {
            category: task.meta().category.clone(),
            pdf: task.id(),
            pages,
        }),
        Err(e) => ProcessResult::failed(task.id(), &e),
    }
}

/// 渲染并识别前 `max_pages` 页，零页 PDF 返回空列表
pub fn extract_pages(
    pdf: &Path,
    out_dir: &Path,
    rasterizer: &dyn PageRasterizer,
    ocr: &dyn OcrEngine,
    max_pages: usize,
) -> anyhow::Result<Vec<PageRecord>> {
    let stem = file_stem(pdf);
    let total = rasterizer
        .page_count(pdf)
        .context("reading page count")?;

    let mut pages = Vec::new();
    for page in 1..=total.min(max_pages) {
        let image_path = out_dir.join(format!("{}_pagina_{}.jpg", stem, page));
        let text_path = out_dir.join(format!("{}_pagina_{}.txt", stem, page));

        rasterizer
            .render_page(pdf, page, &image_path)
            .with_context(|| format!("rendering page {}", page))?;

        let text = ocr
            .recognize(&image_path)
            .with_context(|| format!("OCR of page {}", page))?;

        fs::write(&text_path, &text)
            .with_context(|| format!("writing {}", text_path.display()))?;

        pages.push(PageRecord {
            texto: text,
            imagen: image_path.display().to_string(),
            txt: text_path.display().to_string(),
        });
    }

    Ok(pages)
}

/// 写出页面清单（按类别、PDF、页码排序）
pub fn write_manifest(path: &Path, results: &[PdfPages]) -> Result<()> {
    let mut sorted: Vec<&PdfPages> = results.iter().collect();
    sorted.sort_by(|a, b| (&a.category, &a.pdf).cmp(&(&b.category, &b.pdf)));

    fsio::write_atomic(path, |writer| {
        let mut csv_writer = csv::Writer::from_writer(&mut *writer);
        for result in sorted {
            for (index, page) in result.pages.iter().enumerate() {
                csv_writer.serialize(ManifestRow {
                    category: &result.category,
                    pdf: &result.pdf,
                    page: index + 1,
                    imagen: &page.imagen,
                    txt: &page.txt,
                })?;
            }
        }
        csv_writer.flush().map_err(|e| DocprepError::FileWriteError {
            path: path.display().to_string(),
            source: e,
        })?;
        drop(csv_writer);
        writer.flush().map_err(|e| DocprepError::FileWriteError {
            path: path.display().to_string(),
            source: e,
        })
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string())
}
