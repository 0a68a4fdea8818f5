// ==========================================
// Excel 批量入库引擎 - 导入层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 导入层错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    // ===== 工作表校验错误 =====
    #[error("工作表 '{sheet}' 缺少表头行（第 2 物理行）")]
    SheetHeaderError { sheet: String },

    #[error("工作表 '{sheet}' 缺少必需列: {columns:?}")]
    MissingColumns { sheet: String, columns: Vec<String> },

    #[error("工作表 '{sheet}' 表头列名重复: {columns:?}")]
    DuplicateColumns { sheet: String, columns: Vec<String> },

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 是否属于工作表校验错误（SHEET_VALIDATION_ERROR 分类）
    pub fn is_sheet_validation(&self) -> bool {
        matches!(
            self,
            ImportError::SheetHeaderError { .. }
                | ImportError::MissingColumns { .. }
                | ImportError::DuplicateColumns { .. }
        )
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<calamine::XlsxError>
impl From<calamine::XlsxError> for ImportError {
    fn from(err: calamine::XlsxError) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
