//! # 外部命令执行
//!
//! 启动外部程序（pdfinfo, pdftoppm, tesseract, 编码器脚本），
//! 可选写入 stdin、限时等待并收集输出。
//!
//! ## 依赖关系
//! - 被 `engines/raster.rs`, `engines/ocr.rs`, `engines/encoder.rs` 使用

use crate::error::{DocprepError, Result};

use std::ffi::OsString;
use std::io::{ErrorKind, Read, Write};
use std::process::{Child, Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// 外部命令
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    program: OsString,
    args: Vec<OsString>,
    stdin: Option<Vec<u8>>,
    timeout: Option<Duration>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// 写入子进程 stdin 的内容
    pub fn stdin(mut self, bytes: Vec<u8>) -> Self {
        self.stdin = Some(bytes);
        self
    }

    /// 超时时间（`None` 表示不限时）
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// 命令行文本，用于错误信息
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|s| s.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// 启动子进程，stdin/stdout/stderr 全部接管道，由调用方负责收尾
    pub fn start(&self) -> Result<Child> {
        self.spawn(Stdio::piped())
    }

    /// 执行并返回 stdout；非零退出码视为失败
    pub fn run(&self) -> Result<Vec<u8>> {
        let mut child = self.spawn(if self.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })?;

        // 读写都放到独立线程，超时计时从启动后立刻开始
        let stdout_reader = spawn_reader(child.stdout.take());
        let stderr_reader = spawn_reader(child.stderr.take());
        let stdin_writer = spawn_writer(child.stdin.take(), self.stdin.clone());

        let status = self.wait(&mut child);
        join_writer(stdin_writer);
        let status = status?;
        let output = Output {
            status,
            stdout: join_reader(stdout_reader),
            stderr: join_reader(stderr_reader),
        };

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(DocprepError::CommandFailed {
                command: self.display(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn spawn(&self, stdin: Stdio) -> Result<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => DocprepError::CommandNotFound {
                    command: self.program.to_string_lossy().to_string(),
                },
                _ => DocprepError::CommandFailed {
                    command: self.display(),
                    stderr: e.to_string(),
                },
            })
    }

    fn wait(&self, child: &mut Child) -> Result<std::process::ExitStatus> {
        let wait_err = |e: std::io::Error| DocprepError::CommandFailed {
            command: self.display(),
            stderr: e.to_string(),
        };

        let Some(timeout) = self.timeout else {
            return child.wait().map_err(wait_err);
        };

        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait().map_err(wait_err)? {
                return Ok(status);
            }
            if start.elapsed() > timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(DocprepError::CommandTimeout {
                    command: self.display(),
                    timeout,
                });
            }
            thread::sleep(Duration::from_millis(20));
        }
    }
}

pub(super) fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// 子进程可能不读 stdin 就退出或被杀掉，此时写入失败不算错误
fn spawn_writer<W: Write + Send + 'static>(
    pipe: Option<W>,
    bytes: Option<Vec<u8>>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        if let (Some(mut pipe), Some(bytes)) = (pipe, bytes) {
            let _ = pipe.write_all(&bytes);
        }
    })
}

fn join_writer(handle: JoinHandle<()>) {
    let _ = handle.join();
}

pub(super) fn join_reader(handle: JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.join().unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_run_captures_stdout() {
        let out = ExternalCommand::new("sh")
            .args(["-c", "printf hola"])
            .run()
            .unwrap();
        assert_eq!(out, b"hola");
    }

    #[test]
    fn test_stdin_is_forwarded() {
        let out = ExternalCommand::new("cat")
            .stdin(b"{\"a\": 1}".to_vec())
            .run()
            .unwrap();
        assert_eq!(out, b"{\"a\": 1}");
    }

    #[test]
    fn test_nonzero_exit_is_failure() {
        let err = ExternalCommand::new("sh")
            .args(["-c", "echo broken >&2; exit 3"])
            .run()
            .unwrap_err();
        match err {
            DocprepError::CommandFailed { stderr, .. } => assert_eq!(stderr, "broken"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_program() {
        let err = ExternalCommand::new("docprep-no-such-program").run().unwrap_err();
        assert!(matches!(err, DocprepError::CommandNotFound { .. }));
    }

    #[test]
    fn test_timeout_kills_child() {
        let err = ExternalCommand::new("sleep")
            .arg("5")
            .timeout(Some(Duration::from_millis(200)))
            .run()
            .unwrap_err();
        assert!(matches!(err, DocprepError::CommandTimeout { .. }));
    }

    #[test]
    fn test_timeout_holds_while_child_ignores_stdin() {
        // 请求远大于管道缓冲区，子进程一直不读
        let start = Instant::now();
        let err = ExternalCommand::new("sleep")
            .arg("3")
            .stdin(vec![b'x'; 1 << 20])
            .timeout(Some(Duration::from_millis(200)))
            .run()
            .unwrap_err();

        assert!(start.elapsed() < Duration::from_secs(2));
        match err {
            DocprepError::CommandTimeout { timeout, .. } => {
                assert_eq!(timeout, Duration::from_millis(200))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_timeout_message_keeps_subsecond_precision() {
        let err = DocprepError::CommandTimeout {
            command: "sleep 5".to_string(),
            timeout: Duration::from_millis(200),
        };
        assert_eq!(
            err.to_string(),
            "External command timed out after 200ms: sleep 5"
        );
    }

    #[test]
    fn test_large_stdin_is_forwarded() {
        let payload = vec![b'y'; 1 << 20];
        let out = ExternalCommand::new("cat")
            .stdin(payload.clone())
            .timeout(Some(Duration::from_secs(10)))
            .run()
            .unwrap();
        assert_eq!(out, payload);
    }
}
