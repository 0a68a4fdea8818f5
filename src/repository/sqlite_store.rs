// ==========================================
// Excel 批量入库引擎 - SQLite 存储实现
// ==========================================
// 职责: StoreHandle 的 rusqlite 实现
// 红线: 不含业务规则，只做分批 INSERT 与事务指令
// ==========================================

use crate::domain::cell::CellValue;
use crate::repository::error::RepositoryResult;
use crate::repository::store_handle::{ReturnedRows, StoreHandle};
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

// ==========================================
// SqliteStore
// ==========================================
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// 基于已配置的连接创建存储句柄
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// 打开数据库文件并应用统一 PRAGMA
    pub fn open(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self::new(conn))
    }

    /// 取回底层连接（测试/校验用）
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    /// 标识符转义（表名/列名来自受信配置，仍统一加引号）
    fn quote_ident(ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn insert_sql(table: &str, columns: &[String], row_count: usize, returning: bool) -> String {
        let cols_sql = columns
            .iter()
            .map(|c| Self::quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = std::iter::repeat(format!(
            "({})",
            vec!["?"; columns.len()].join(", ")
        ))
        .take(row_count)
        .collect::<Vec<_>>()
        .join(", ");

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            Self::quote_ident(table),
            cols_sql,
            placeholders
        );
        if returning {
            sql.push_str(" RETURNING *");
        }
        sql
    }
}

impl StoreHandle for SqliteStore {
    fn begin(&mut self) -> RepositoryResult<()> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> RepositoryResult<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> RepositoryResult<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn execute_batch_insert(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<CellValue>],
        returning: bool,
        page_size: usize,
    ) -> RepositoryResult<(usize, Option<ReturnedRows>)> {
        let page_size = page_size.max(1);
        let mut inserted = 0usize;
        let mut returned: Option<ReturnedRows> = if returning {
            Some(ReturnedRows {
                columns: Vec::new(),
                rows: Vec::new(),
            })
        } else {
            None
        };

        for chunk in rows.chunks(page_size) {
            let sql = Self::insert_sql(table, columns, chunk.len(), returning);
            let mut stmt = self.conn.prepare(&sql)?;
            let params = params_from_iter(chunk.iter().flatten());

            if let Some(captured) = returned.as_mut() {
                if captured.columns.is_empty() {
                    captured.columns = stmt
                        .column_names()
                        .into_iter()
                        .map(|c| c.to_string())
                        .collect();
                }
                let column_count = stmt.column_count();
                let mut rows_iter = stmt.query(params)?;
                while let Some(row) = rows_iter.next()? {
                    let mut out: Vec<CellValue> = Vec::with_capacity(column_count);
                    for idx in 0..column_count {
                        out.push(CellValue::from(row.get_ref(idx)?));
                    }
                    captured.rows.push(out);
                    inserted += 1;
                }
            } else {
                inserted += stmt.execute(params)?;
            }

            debug!(table = %table, batch = chunk.len(), "批次插入完成");
        }

        Ok((inserted, returned))
    }
}
