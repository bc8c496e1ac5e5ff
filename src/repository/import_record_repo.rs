// ==========================================
// 楼盘单元库存系统 - 导入记录仓储
// ==========================================
// 职责: import_record 表数据访问
// 红线: raw_data 快照落库后不可变更,仅计数与 processed 可回填
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::import::ImportRecord;
use crate::domain::mapping::FieldMapping;
use crate::repository::error::{RepoResult, RepositoryError};
use crate::repository::mapping_repo::insert_mapping_tx;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex};

/// 事务内插入导入记录
pub fn insert_record_tx(tx: &Transaction<'_>, record: &ImportRecord) -> RepoResult<()> {
    tx.execute(
        r#"
        INSERT INTO import_record (
            import_id, project_id, imported_by, total_units, created_units,
            updated_units, skipped_units, processed, raw_data, field_mapping_id,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
        params![
            record.import_id,
            record.project_id,
            record.imported_by,
            record.total_units,
            record.created_units,
            record.updated_units,
            record.skipped_units,
            record.processed as i64,
            record.raw_data,
            record.field_mapping_id,
            record.created_at,
            record.updated_at,
        ],
    )?;
    Ok(())
}

/// 处理完成后回填的计数
#[derive(Debug, Clone, Copy)]
pub struct ImportCounts {
    pub total: i64,
    pub created: i64,
    pub updated: i64,
    pub skipped: i64,
}

// ==========================================
// ImportRecordRepository Trait
// ==========================================
#[async_trait]
pub trait ImportRecordRepository: Send + Sync {
    /// 处理前落库（processed=false,计数为 0）
    async fn insert(&self, record: &ImportRecord) -> RepoResult<()>;

    /// 门禁暂存: 未审批推断映射 + processed=false 导入记录,单事务写入
    ///
    /// 任一失败整体回滚,不残留无记录引用的孤儿映射
    async fn insert_pending(
        &self,
        mapping: &FieldMapping,
        record: &ImportRecord,
    ) -> RepoResult<()>;

    /// 按 ID 获取
    async fn get(&self, import_id: &str) -> RepoResult<Option<ImportRecord>>;

    /// 项目导入历史（新到旧）
    async fn list_by_project(&self, project_id: &str) -> RepoResult<Vec<ImportRecord>>;

    /// 事务提交后回填最终计数与 processed 标志
    async fn update_result(
        &self,
        import_id: &str,
        counts: ImportCounts,
        processed: bool,
    ) -> RepoResult<()>;
}

// ==========================================
// ImportRecordRepositoryImpl
// ==========================================
#[derive(Clone)]
pub struct ImportRecordRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ImportRecordRepositoryImpl {
    pub fn new(db_path: &str) -> RepoResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepoResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    fn lock(&self) -> RepoResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ImportRecord> {
        Ok(ImportRecord {
            import_id: row.get(0)?,
            project_id: row.get(1)?,
            imported_by: row.get(2)?,
            total_units: row.get(3)?,
            created_units: row.get(4)?,
            updated_units: row.get(5)?,
            skipped_units: row.get(6)?,
            processed: row.get::<_, i64>(7)? != 0,
            raw_data: row.get(8)?,
            field_mapping_id: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    const COLUMNS: &'static str = "import_id, project_id, imported_by, total_units, \
         created_units, updated_units, skipped_units, processed, raw_data, \
         field_mapping_id, created_at, updated_at";
}

#[async_trait]
impl ImportRecordRepository for ImportRecordRepositoryImpl {
    async fn insert(&self, record: &ImportRecord) -> RepoResult<()> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        insert_record_tx(&tx, record)?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    async fn insert_pending(
        &self,
        mapping: &FieldMapping,
        record: &ImportRecord,
    ) -> RepoResult<()> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        // 记录引用映射 ID,映射先行
        insert_mapping_tx(&tx, mapping)?;
        insert_record_tx(&tx, record)?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, import_id: &str) -> RepoResult<Option<ImportRecord>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM import_record WHERE import_id = ?1",
            Self::COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![import_id], Self::record_from_row)
            .optional()?)
    }

    async fn list_by_project(&self, project_id: &str) -> RepoResult<Vec<ImportRecord>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM import_record WHERE project_id = ?1 ORDER BY created_at DESC",
            Self::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![project_id], Self::record_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn update_result(
        &self,
        import_id: &str,
        counts: ImportCounts,
        processed: bool,
    ) -> RepoResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            r#"
            UPDATE import_record SET
                total_units = ?2, created_units = ?3, updated_units = ?4,
                skipped_units = ?5, processed = ?6, updated_at = ?7
            WHERE import_id = ?1
            "#,
            params![
                import_id,
                counts.total,
                counts.created,
                counts.updated,
                counts.skipped,
                processed as i64,
                Utc::now(),
            ],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ImportRecord".to_string(),
                id: import_id.to_string(),
            });
        }
        Ok(())
    }
}
