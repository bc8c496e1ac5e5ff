// ==========================================
// 楼盘单元库存系统 - 字段映射仓储
// ==========================================
// 职责: field_mapping 表数据访问
// 红线: 映射永不被自动删除;审批/默认标志仅通过显式操作翻转
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::mapping::{FieldMapping, MappingTarget};
use crate::repository::error::{RepoResult, RepositoryError};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// 事务内插入映射（供跨表原子写入复用,如门禁暂存）
pub fn insert_mapping_tx(tx: &Transaction<'_>, mapping: &FieldMapping) -> RepoResult<()> {
    let mappings_json = serde_json::to_string(&mapping.mappings)?;
    tx.execute(
        r#"
        INSERT INTO field_mapping (
            mapping_id, project_id, name, mappings, is_default, is_approved,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            mapping.mapping_id,
            mapping.project_id,
            mapping.name,
            mappings_json,
            mapping.is_default as i64,
            mapping.is_approved as i64,
            mapping.created_at,
            mapping.updated_at,
        ],
    )?;
    Ok(())
}

// ==========================================
// FieldMappingRepository Trait
// ==========================================
#[async_trait]
pub trait FieldMappingRepository: Send + Sync {
    /// 持久化新映射
    async fn insert(&self, mapping: &FieldMapping) -> RepoResult<()>;

    /// 按 ID 获取映射
    async fn get(&self, mapping_id: &str) -> RepoResult<Option<FieldMapping>>;

    /// 查找项目的默认且已审批映射（自动化导入门禁入口）
    async fn find_default_approved(&self, project_id: &str) -> RepoResult<Option<FieldMapping>>;

    /// 项目全部映射
    async fn list_by_project(&self, project_id: &str) -> RepoResult<Vec<FieldMapping>>;

    /// 翻转审批标志（带外审批动作）
    async fn set_approved(&self, mapping_id: &str, approved: bool) -> RepoResult<()>;

    /// 设为项目默认映射（同事务内清除项目原默认,保证至多一条默认）
    async fn set_default(&self, project_id: &str, mapping_id: &str) -> RepoResult<()>;
}

// ==========================================
// FieldMappingRepositoryImpl
// ==========================================
#[derive(Clone)]
pub struct FieldMappingRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl FieldMappingRepositoryImpl {
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

    fn mapping_from_row(row: &Row<'_>) -> rusqlite::Result<(FieldMapping, String)> {
        let mappings_raw: String = row.get(3)?;
        Ok((
            FieldMapping {
                mapping_id: row.get(0)?,
                project_id: row.get(1)?,
                name: row.get(2)?,
                mappings: HashMap::new(),
                is_default: row.get::<_, i64>(4)? != 0,
                is_approved: row.get::<_, i64>(5)? != 0,
                created_at: row.get(6)?,
                updated_at: row.get(7)?,
            },
            mappings_raw,
        ))
    }

    fn decode(entry: (FieldMapping, String)) -> RepoResult<FieldMapping> {
        let (mut mapping, raw) = entry;
        mapping.mappings = serde_json::from_str::<HashMap<String, MappingTarget>>(&raw)?;
        Ok(mapping)
    }

    const COLUMNS: &'static str =
        "mapping_id, project_id, name, mappings, is_default, is_approved, created_at, updated_at";
}

#[async_trait]
impl FieldMappingRepository for FieldMappingRepositoryImpl {
    async fn insert(&self, mapping: &FieldMapping) -> RepoResult<()> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        insert_mapping_tx(&tx, mapping)?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, mapping_id: &str) -> RepoResult<Option<FieldMapping>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM field_mapping WHERE mapping_id = ?1",
            Self::COLUMNS
        );
        let entry = conn
            .query_row(&sql, params![mapping_id], Self::mapping_from_row)
            .optional()?;
        entry.map(Self::decode).transpose()
    }

    async fn find_default_approved(&self, project_id: &str) -> RepoResult<Option<FieldMapping>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM field_mapping \
             WHERE project_id = ?1 AND is_default = 1 AND is_approved = 1 \
             ORDER BY updated_at DESC LIMIT 1",
            Self::COLUMNS
        );
        let entry = conn
            .query_row(&sql, params![project_id], Self::mapping_from_row)
            .optional()?;
        entry.map(Self::decode).transpose()
    }

    async fn list_by_project(&self, project_id: &str) -> RepoResult<Vec<FieldMapping>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM field_mapping WHERE project_id = ?1 ORDER BY created_at",
            Self::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![project_id], Self::mapping_from_row)?;
        let mut mappings = Vec::new();
        for entry in rows {
            mappings.push(Self::decode(entry?)?);
        }
        Ok(mappings)
    }

    async fn set_approved(&self, mapping_id: &str, approved: bool) -> RepoResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE field_mapping SET is_approved = ?2, updated_at = ?3 WHERE mapping_id = ?1",
            params![mapping_id, approved as i64, Utc::now()],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound {
                entity: "FieldMapping".to_string(),
                id: mapping_id.to_string(),
            });
        }
        Ok(())
    }

    async fn set_default(&self, project_id: &str, mapping_id: &str) -> RepoResult<()> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tx.execute(
            "UPDATE field_mapping SET is_default = 0, updated_at = ?2 \
             WHERE project_id = ?1 AND is_default = 1",
            params![project_id, Utc::now()],
        )?;
        let changed = tx.execute(
            "UPDATE field_mapping SET is_default = 1, updated_at = ?3 \
             WHERE mapping_id = ?1 AND project_id = ?2",
            params![mapping_id, project_id, Utc::now()],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound {
                entity: "FieldMapping".to_string(),
                id: mapping_id.to_string(),
            });
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }
}
