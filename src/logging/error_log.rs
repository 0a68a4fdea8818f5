// ==========================================
// Excel 批量入库引擎 - 结构化错误日志
// ==========================================
// 职责: JSON Lines 固定模式错误记录的缓冲与落盘
// 约束: 键集合固定为 {timestamp, file, sheet, row, error_type, db_message}，禁止附加键
// ==========================================

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 文件级错误的工作表哨兵值
pub const FILE_LEVEL_SHEET: &str = "<FILE_LEVEL>";

/// 无具体行号的哨兵值（行号为 1 基；小于 -1 非法）
pub const NO_ROW: i64 = -1;

/// 默认日志目录
const LOGS_DIR: &str = "./logs";

/// 日志层错误类型
#[derive(Error, Debug)]
pub enum ErrorLogError {
    #[error("错误日志写入失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("错误记录序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// 结构化错误记录（模式固定，追加写，不得携带额外键）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    /// ISO8601 UTC 时间戳（Z 后缀）
    pub timestamp: String,
    pub file: String,
    /// 工作表名（文件级错误为 FILE_LEVEL_SHEET）
    pub sheet: String,
    /// 1 基行号（无具体行时为 -1）
    pub row: i64,
    /// UPPER_SNAKE_CASE 错误分类
    pub error_type: String,
    pub db_message: String,
}

impl ErrorRecord {
    /// 以当前 UTC 时间创建一条记录
    pub fn create(
        file: &str,
        sheet: &str,
        row: i64,
        error_type: &str,
        db_message: &str,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            file: file.to_string(),
            sheet: sheet.to_string(),
            row,
            error_type: error_type.to_string(),
            db_message: db_message.to_string(),
        }
    }

    /// 序列化为单行 JSON
    pub fn to_json_line(&self) -> Result<String, ErrorLogError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// 错误记录内存缓冲（flush 写出 JSON Lines）
///
/// - 文件路径首次访问时确定: logs/errors-YYYYMMDD-HHMMSS.log（UTC）
/// - flush 保持记录的插入顺序，追加写
/// - 串行执行，不要求线程安全
pub struct ErrorLogBuffer {
    records: Vec<ErrorRecord>,
    logs_dir: PathBuf,
    file_path: Option<PathBuf>,
}

impl Default for ErrorLogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorLogBuffer {
    pub fn new() -> Self {
        Self::with_dir(LOGS_DIR)
    }

    /// 指定日志目录（测试用）
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            records: Vec::new(),
            logs_dir: dir.as_ref().to_path_buf(),
            file_path: None,
        }
    }

    pub fn append(&mut self, record: ErrorRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 目标文件路径（首次访问时确定并确保目录存在）
    pub fn file_path(&mut self) -> Result<&Path, ErrorLogError> {
        if self.file_path.is_none() {
            std::fs::create_dir_all(&self.logs_dir)?;
            let stamp = Utc::now().format("%Y%m%d-%H%M%S");
            self.file_path = Some(self.logs_dir.join(format!("errors-{}.log", stamp)));
        }
        Ok(self.file_path.as_deref().unwrap_or(Path::new("")))
    }

    /// 将缓冲记录按插入顺序追加写出，并清空缓冲
    ///
    /// 空缓冲只确定文件路径，不创建文件。
    pub fn flush(&mut self) -> Result<PathBuf, ErrorLogError> {
        let path = self.file_path()?.to_path_buf();
        if self.records.is_empty() {
            return Ok(path);
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        for record in &self.records {
            writeln!(file, "{}", record.to_json_line()?)?;
        }
        self.records.clear();
        Ok(path)
    }
}
