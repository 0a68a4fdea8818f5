// ==========================================
// Excel 批量入库引擎 - 存储句柄接口
// ==========================================
// 职责: 编排器消费的窄数据库接口
// 红线: 接口之上不出现任何驱动类型
// ==========================================

use crate::domain::cell::CellValue;
use crate::repository::error::RepositoryResult;

/// 带 RETURNING 捕获的插入返回行集
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnedRows {
    /// 返回行的列名（目标表全列）
    pub columns: Vec<String>,
    /// 返回行（与 columns 按位置对齐）
    pub rows: Vec<Vec<CellValue>>,
}

/// 存储句柄接口
///
/// 事务纪律: 每个文件一个事务，显式 begin/commit/rollback，
/// 不嵌套、不跨文件。句柄缺省（None）即 mock 模式，
/// 所有插入按输入行数模拟成功且不发出任何事务指令。
pub trait StoreHandle {
    /// 开启事务
    fn begin(&mut self) -> RepositoryResult<()>;

    /// 提交事务
    fn commit(&mut self) -> RepositoryResult<()>;

    /// 回滚事务
    fn rollback(&mut self) -> RepositoryResult<()>;

    /// 分组批量插入
    ///
    /// # 参数
    /// - table: 目标表名
    /// - columns: 插入列（已排除自增列）
    /// - rows: 行值，与 columns 按位置对齐
    /// - returning: true 时返回每一插入行的全列集（生成主键捕获）
    /// - page_size: 物理分批大小提示
    ///
    /// # 返回
    /// (插入行数, RETURNING 行集（returning=false 时为 None）)
    fn execute_batch_insert(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<CellValue>],
        returning: bool,
        page_size: usize,
    ) -> RepositoryResult<(usize, Option<ReturnedRows>)>;
}
