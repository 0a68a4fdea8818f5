// ==========================================
// Excel 批量入库引擎 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 仓储层错误类型（StoreHandle 实现内部使用）
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    RepositoryError::UniqueConstraintViolation(msg)
                } else if msg.contains("FOREIGN KEY") {
                    RepositoryError::ForeignKeyViolation(msg)
                } else {
                    RepositoryError::DatabaseQueryError(msg)
                }
            }
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// 批量插入执行错误
///
/// 仓储/驱动层的失败在此统一包装为消息，
/// 驱动异常类型不跨越该边界泄漏。
#[derive(Error, Debug)]
pub enum BatchInsertError {
    #[error("批量插入执行失败 (表 {table}): {message}")]
    Execute { table: String, message: String },

    #[error("BLOB 文件读取失败 (列 {column}, 路径 {path}): {message}")]
    BlobRead {
        column: String,
        path: String,
        message: String,
    },
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
