//! # 多模态编码器
//!
//! 把一张图像和它的 OCR 文本编码为模型输入张量。编码本身由外部程序完成，
//! 有两种调用方式：
//! - `CommandEncoder`: 每个样本启动一次编码命令，stdin 写入请求 JSON，stdout 读回一个 JSON 对象
//! - `PersistentEncoder`: 每个工作线程保留一个常驻进程，按行收发请求与响应，模型只加载一次
//!
//! 请求: `{"image": "...", "text": "...", "max_length": 512}`
//! 响应: `{"input_ids": [...], "bbox": [...], "pixel_values": [...], "attention_mask": [...]}`
//!
//! ## 依赖关系
//! - 被 `commands/encode.rs` 使用
//! - 使用 `engines/command.rs` 执行外部命令
//! - 使用 `serde_json` 编解码请求与响应

use super::command::{join_reader, spawn_reader, ExternalCommand};
use crate::error::{DocprepError, Result};

use serde::Serialize;
use serde_json::{Map, Value};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::Child;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// 编码结果（字段名 → 张量/值）
pub type Encoding = Map<String, Value>;

/// 编码器接口
pub trait DocumentEncoder: Sync {
    fn encode(&self, image: &Path, text: &str) -> Result<Encoding>;
}

/// 发送给编码命令的请求
#[derive(Debug, Serialize)]
struct EncodeRequest<'a> {
    image: &'a Path,
    text: &'a str,
    max_length: usize,
}

fn request_body(image: &Path, text: &str, max_length: usize) -> Result<Vec<u8>> {
    let request = EncodeRequest {
        image,
        text,
        max_length,
    };
    serde_json::to_vec(&request).map_err(|e| DocprepError::JsonWriteError {
        path: "<encoder stdin>".to_string(),
        source: e,
    })
}

/// 编码命令：程序与参数
///
/// 命令行文本按空白切分，不识别引号；含空格的参数用 `extra_args` 原样追加。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderCommand {
    program: String,
    args: Vec<String>,
}

impl EncoderCommand {
    pub fn parse(command_line: &str, extra_args: &[String]) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| {
            DocprepError::InvalidArgument("encoder command is empty".to_string())
        })?;
        let mut args: Vec<String> = parts.collect();
        args.extend(extra_args.iter().cloned());
        Ok(Self { program, args })
    }

    fn external(&self) -> ExternalCommand {
        ExternalCommand::new(&self.program).args(&self.args)
    }
}

/// 外部命令编码器（每个样本一个进程）
#[derive(Debug, Clone)]
pub struct CommandEncoder {
    command: EncoderCommand,
    max_length: usize,
    timeout: Option<Duration>,
}

impl CommandEncoder {
    pub fn new(command: EncoderCommand, max_length: usize, timeout: Option<Duration>) -> Self {
        Self {
            command,
            max_length,
            timeout,
        }
    }
}

impl DocumentEncoder for CommandEncoder {
    fn encode(&self, image: &Path, text: &str) -> Result<Encoding> {
        let body = request_body(image, text, self.max_length)?;
        let command = self.command.external().stdin(body).timeout(self.timeout);
        let stdout = command.run()?;

        parse_encoding(&stdout, &command.display())
    }
}

/// 常驻编码器
///
/// 空闲进程放在池里，同一时刻每个进程只服务一个工作线程，
/// 因此池中进程数不超过并行作业数。超时或出错的进程直接丢弃。
pub struct PersistentEncoder {
    command: EncoderCommand,
    max_length: usize,
    timeout: Option<Duration>,
    idle: Mutex<Vec<EncoderSession>>,
}

impl PersistentEncoder {
    pub fn new(command: EncoderCommand, max_length: usize, timeout: Option<Duration>) -> Self {
        Self {
            command,
            max_length,
            timeout,
            idle: Mutex::new(Vec::new()),
        }
    }

    fn checkout(&self) -> Result<EncoderSession> {
        let reused = self.idle.lock().unwrap_or_else(|e| e.into_inner()).pop();
        match reused {
            Some(session) => Ok(session),
            None => EncoderSession::start(&self.command.external()),
        }
    }

    fn checkin(&self, session: EncoderSession) {
        self.idle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(session);
    }

    #[cfg(test)]
    fn idle_sessions(&self) -> usize {
        self.idle.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl DocumentEncoder for PersistentEncoder {
    fn encode(&self, image: &Path, text: &str) -> Result<Encoding> {
        let mut body = request_body(image, text, self.max_length)?;
        body.push(b'\n');

        let mut session = self.checkout()?;
        let line = session.exchange(body, self.timeout)?;
        let parsed = parse_encoding(line.as_bytes(), &session.display)
            .and_then(|map| reported_error(map, &session.display));
        // 已完整读回一行，进程仍与请求同步，可继续复用
        self.checkin(session);
        parsed
    }
}

/// 常驻进程对单个样本报错时回一行 `{"error": "..."}`，进程本身继续服务
fn reported_error(map: Encoding, command: &str) -> Result<Encoding> {
    match map.get("error").and_then(Value::as_str) {
        Some(message) => Err(DocprepError::CommandFailed {
            command: command.to_string(),
            stderr: message.to_string(),
        }),
        None => Ok(map),
    }
}

/// 一个常驻编码进程
struct EncoderSession {
    display: String,
    child: Child,
    requests: Sender<Vec<u8>>,
    responses: Receiver<String>,
    stderr: Option<JoinHandle<Vec<u8>>>,
}

impl EncoderSession {
    fn start(command: &ExternalCommand) -> Result<Self> {
        let mut child = command.start()?;

        let (requests, request_rx) = mpsc::channel::<Vec<u8>>();
        let stdin = child.stdin.take();
        thread::spawn(move || {
            let Some(mut stdin) = stdin else { return };
            for body in request_rx {
                if stdin.write_all(&body).and_then(|_| stdin.flush()).is_err() {
                    break;
                }
            }
        });

        let (response_tx, responses) = mpsc::channel::<String>();
        let stdout = child.stdout.take();
        thread::spawn(move || {
            let Some(stdout) = stdout else { return };
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if response_tx.send(line).is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            display: command.display(),
            stderr: Some(spawn_reader(child.stderr.take())),
            child,
            requests,
            responses,
        })
    }

    /// 发送一行请求并等待一行响应
    fn exchange(&mut self, body: Vec<u8>, timeout: Option<Duration>) -> Result<String> {
        if self.requests.send(body).is_err() {
            return Err(self.failure());
        }

        match timeout {
            Some(limit) => match self.responses.recv_timeout(limit) {
                Ok(line) => Ok(line),
                Err(RecvTimeoutError::Timeout) => {
                    self.shutdown();
                    Err(DocprepError::CommandTimeout {
                        command: self.display.clone(),
                        timeout: limit,
                    })
                }
                Err(RecvTimeoutError::Disconnected) => Err(self.failure()),
            },
            None => self.responses.recv().map_err(|_| self.failure()),
        }
    }

    /// 进程提前退出：收尾并带上它的 stderr
    fn failure(&mut self) -> DocprepError {
        self.shutdown();
        let stderr = self.stderr.take().map(join_reader).unwrap_or_default();
        let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
        DocprepError::CommandFailed {
            command: self.display.clone(),
            stderr: if stderr.is_empty() {
                "encoder process exited without a response".to_string()
            } else {
                stderr
            },
        }
    }

    fn shutdown(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for EncoderSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// 解析编码命令输出，要求顶层为 JSON 对象
fn parse_encoding(stdout: &[u8], command: &str) -> Result<Encoding> {
    let value: Value =
        serde_json::from_slice(stdout).map_err(|e| DocprepError::JsonReadError {
            path: format!("<stdout of {}>", command),
            source: e,
        })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(DocprepError::InvalidJsonShape {
            path: format!("<stdout of {}>", command),
            reason: format!("expected an object, got {}", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_encoder_command() {
        let cmd = EncoderCommand::parse("python3 scripts/layoutlmv3_encode.py --model base", &[])
            .unwrap();
        assert_eq!(cmd.program, "python3");
        assert_eq!(cmd.args, vec!["scripts/layoutlmv3_encode.py", "--model", "base"]);

        assert!(EncoderCommand::parse("   ", &[]).is_err());
    }

    #[test]
    fn test_extra_args_keep_spaces() {
        let cmd = EncoderCommand::parse(
            "python3",
            &["/content/drive/My Drive/encode.py".to_string(), "--serve".to_string()],
        )
        .unwrap();
        assert_eq!(cmd.program, "python3");
        assert_eq!(cmd.args, vec!["/content/drive/My Drive/encode.py", "--serve"]);
    }

    #[test]
    fn test_parse_encoding_object() {
        let map = parse_encoding(br#"{"input_ids": [0, 2], "bbox": []}"#, "enc").unwrap();
        assert_eq!(map.len(), 2);
        assert!(map.contains_key("input_ids"));
    }

    #[test]
    fn test_parse_encoding_rejects_array() {
        let err = parse_encoding(b"[1, 2]", "enc").unwrap_err();
        assert!(matches!(err, DocprepError::InvalidJsonShape { .. }));
        assert!(parse_encoding(b"not json", "enc").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_encoder_round_trip_through_process() {
        // `cat` 原样回显请求，用来检查请求格式
        let enc = CommandEncoder::new(EncoderCommand::parse("cat", &[]).unwrap(), 256, None);
        let map = enc.encode(Path::new("/data/doc.jpg"), "Año 2024").unwrap();
        assert_eq!(map["image"], "/data/doc.jpg");
        assert_eq!(map["text"], "Año 2024");
        assert_eq!(map["max_length"], 256);
    }

    #[cfg(unix)]
    #[test]
    fn test_persistent_encoder_reuses_process() {
        let enc = PersistentEncoder::new(
            EncoderCommand::parse("cat", &[]).unwrap(),
            128,
            Some(Duration::from_secs(10)),
        );

        let first = enc.encode(Path::new("/data/a.jpg"), "uno\ndos").unwrap();
        let second = enc.encode(Path::new("/data/b.jpg"), "tres").unwrap();

        assert_eq!(first["text"], "uno\ndos");
        assert_eq!(second["image"], "/data/b.jpg");
        assert_eq!(enc.idle_sessions(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_persistent_encoder_timeout_drops_session() {
        let enc = PersistentEncoder::new(
            EncoderCommand::parse("sleep 5", &[]).unwrap(),
            128,
            Some(Duration::from_millis(200)),
        );

        let start = std::time::Instant::now();
        let err = enc.encode(Path::new("/data/a.jpg"), "texto").unwrap_err();

        assert!(matches!(err, DocprepError::CommandTimeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(enc.idle_sessions(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_persistent_encoder_item_error_keeps_session() {
        let script = r#"while read -r line; do echo '{"error": "ValueError: bad pixels"}'; done"#;
        let enc = PersistentEncoder::new(
            EncoderCommand::parse("sh", &["-c".to_string(), script.to_string()]).unwrap(),
            128,
            Some(Duration::from_secs(10)),
        );

        for _ in 0..2 {
            match enc.encode(Path::new("/data/a.jpg"), "texto").unwrap_err() {
                DocprepError::CommandFailed { stderr, .. } => {
                    assert_eq!(stderr, "ValueError: bad pixels")
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(enc.idle_sessions(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_persistent_encoder_reports_stderr_on_exit() {
        let enc = PersistentEncoder::new(
            EncoderCommand::parse("sh", &["-c".to_string(), "echo model missing >&2".to_string()])
                .unwrap(),
            128,
            Some(Duration::from_secs(10)),
        );

        match enc.encode(Path::new("/data/a.jpg"), "texto").unwrap_err() {
            DocprepError::CommandFailed { stderr, .. } => assert_eq!(stderr, "model missing"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(enc.idle_sessions(), 0);
    }
}
