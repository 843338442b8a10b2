//! # 文件写入工具
//!
//! 先写入同目录下的临时文件，再重命名到目标路径，
//! 保证输出文件要么完整、要么不存在。
//!
//! ## 依赖关系
//! - 被 `formats/` 与 `commands/` 模块使用
//! - 无外部模块依赖

use crate::error::{DocprepError, Result};

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// 以全有或全无的方式写文件
///
/// `write` 回调负责写入内容；回调出错时删除临时文件，目标文件保持不变。
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }

    let tmp = temp_sibling(path);
    let write_err = |e| DocprepError::FileWriteError {
        path: tmp.display().to_string(),
        source: e,
    };

    let result = (|| -> Result<()> {
        let file = File::create(&tmp).map_err(write_err)?;
        let mut writer = BufWriter::new(file);
        write(&mut writer)?;
        writer.flush().map_err(write_err)?;
        Ok(())
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        DocprepError::FileWriteError {
            path: path.display().to_string(),
            source: e,
        }
    })
}

/// 创建目录（含父目录）
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| DocprepError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

/// 读取整个文件为字符串
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| DocprepError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_success() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("sub").join("out.json");

        write_atomic(&target, |w| {
            w.write_all(b"[]").map_err(|e| DocprepError::InvalidArgument(e.to_string()))
        })
        .unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "[]");
        assert!(!temp_sibling(&target).exists());
    }

    #[test]
    fn test_write_atomic_failure_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.json");

        let result = write_atomic(&target, |w| {
            w.write_all(b"[{\"partial\":").unwrap();
            Err(DocprepError::InvalidArgument("serializer failed".to_string()))
        });

        assert!(result.is_err());
        assert!(!target.exists());
        assert!(!temp_sibling(&target).exists());
    }
}
