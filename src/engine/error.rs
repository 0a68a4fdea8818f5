// ==========================================
// Excel 批量入库引擎 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分级: 致命（整次运行中止） / 传播级（单文件硬失败）
// ==========================================

use thiserror::Error;

/// 致命处理错误（在任何文件被处理之前中止整次运行）
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("目录不存在: {0}")]
    DirectoryNotFound(String),

    #[error("路径不是目录: {0}")]
    NotADirectory(String),

    #[error("目录读取失败 ({path}): {message}")]
    DirectoryReadError { path: String, message: String },

    #[error("工作表映射配置无效 ('{sheet}'): {message}")]
    InvalidMapping { sheet: String, message: String },
}

/// 外键传播错误（当前文件硬失败，运行继续）
#[derive(Error, Debug)]
pub enum FkPropagationError {
    #[error("列 '{column}' 不在列集合中: {columns:?}")]
    ColumnNotFound {
        column: String,
        columns: Vec<String>,
    },

    #[error("行列数不足: 实际 {actual} 列, 需要至少 {required} 列")]
    RowTooShort { actual: usize, required: usize },

    #[error("父标识 '{identifier}' 未在父表 '{parent_table}' 的主键映射中找到")]
    UnresolvedReference {
        identifier: String,
        parent_table: String,
    },
}
