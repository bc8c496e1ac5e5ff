// ==========================================
// 楼盘单元库存系统 - 库存仓储实现
// ==========================================
// 职责: 实现库存相关数据访问（使用 rusqlite）
// 红线: Repository 不含业务规则,只做数据 CRUD
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::project::{Building, Layout, Project};
use crate::domain::types::{UnitStatus, UpdateType};
use crate::domain::unit::{Unit, UnitVersion, VersionMetadata};
use crate::repository::error::{RepoResult, RepositoryError};
use crate::repository::inventory_repo::{InventoryRepository, UnitMutation};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row, Transaction};
use std::sync::{Arc, Mutex};

// ==========================================
// InventoryRepositoryImpl
// ==========================================
#[derive(Clone)]
pub struct InventoryRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl InventoryRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepoResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（连接行为保持统一 PRAGMA,幂等）
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

    // ===== 行映射 =====

    fn unit_from_row(row: &Row<'_>) -> rusqlite::Result<Unit> {
        Ok(Unit {
            unit_id: row.get(0)?,
            project_id: row.get(1)?,
            building_id: row.get(2)?,
            layout_id: row.get(3)?,
            unit_number: row.get(4)?,
            slug: row.get(5)?,
            floor_number: row.get(6)?,
            status: UnitStatus::parse(&row.get::<_, String>(7)?),
            price: row.get(8)?,
            discount_price: row.get(9)?,
            area: row.get(10)?,
            bedrooms: row.get(11)?,
            bathrooms: row.get(12)?,
            description: row.get(13)?,
            view: row.get(14)?,
            created_at: row.get(15)?,
            updated_at: row.get(16)?,
        })
    }

    const UNIT_COLUMNS: &'static str = "unit_id, project_id, building_id, layout_id, unit_number, \
         slug, floor_number, status, price, discount_price, area, bedrooms, bathrooms, \
         description, view, created_at, updated_at";

    // ===== 事务内写入助手 =====

    fn insert_unit_tx(tx: &Transaction<'_>, unit: &Unit) -> RepoResult<()> {
        tx.execute(
            r#"
            INSERT INTO unit (
                unit_id, project_id, building_id, layout_id, unit_number, slug,
                floor_number, status, price, discount_price, area, bedrooms,
                bathrooms, description, view, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
            params![
                unit.unit_id,
                unit.project_id,
                unit.building_id,
                unit.layout_id,
                unit.unit_number,
                unit.slug,
                unit.floor_number,
                unit.status.as_str(),
                unit.price,
                unit.discount_price,
                unit.area,
                unit.bedrooms,
                unit.bathrooms,
                unit.description,
                unit.view,
                unit.created_at,
                unit.updated_at,
            ],
        )?;
        Ok(())
    }

    fn update_unit_tx(tx: &Transaction<'_>, unit: &Unit) -> RepoResult<()> {
        tx.execute(
            r#"
            UPDATE unit SET
                building_id = ?2, layout_id = ?3, unit_number = ?4, slug = ?5,
                floor_number = ?6, status = ?7, price = ?8, discount_price = ?9,
                area = ?10, bedrooms = ?11, bathrooms = ?12, description = ?13,
                view = ?14, updated_at = ?15
            WHERE unit_id = ?1
            "#,
            params![
                unit.unit_id,
                unit.building_id,
                unit.layout_id,
                unit.unit_number,
                unit.slug,
                unit.floor_number,
                unit.status.as_str(),
                unit.price,
                unit.discount_price,
                unit.area,
                unit.bedrooms,
                unit.bathrooms,
                unit.description,
                unit.view,
                unit.updated_at,
            ],
        )?;
        Ok(())
    }

    fn insert_version_tx(tx: &Transaction<'_>, version: &UnitVersion) -> RepoResult<()> {
        let metadata_json = serde_json::to_string(&version.metadata)?;
        tx.execute(
            r#"
            INSERT INTO unit_version (
                version_id, unit_id, import_id, unit_number, status, price,
                update_type, metadata, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                version.version_id,
                version.unit_id,
                version.import_id,
                version.unit_number,
                version.status.as_str(),
                version.price,
                version.update_type.as_str(),
                metadata_json,
                version.created_at,
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl InventoryRepository for InventoryRepositoryImpl {
    async fn get_project(&self, project_id: &str) -> RepoResult<Option<Project>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT project_id, name, default_building_id, created_at FROM project WHERE project_id = ?1",
        )?;
        let mut rows = stmt.query_map(params![project_id], |row| {
            Ok(Project {
                project_id: row.get(0)?,
                name: row.get(1)?,
                default_building_id: row.get(2)?,
                created_at: row.get::<_, DateTime<Utc>>(3)?,
            })
        })?;
        match rows.next() {
            Some(p) => Ok(Some(p?)),
            None => Ok(None),
        }
    }

    async fn list_buildings(&self, project_id: &str) -> RepoResult<Vec<Building>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT building_id, project_id, name, created_at FROM building \
             WHERE project_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![project_id], |row| {
            Ok(Building {
                building_id: row.get(0)?,
                project_id: row.get(1)?,
                name: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn list_layouts(&self, project_id: &str) -> RepoResult<Vec<Layout>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT layout_id, project_id, name, created_at FROM layout \
             WHERE project_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![project_id], |row| {
            Ok(Layout {
                layout_id: row.get(0)?,
                project_id: row.get(1)?,
                name: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn list_units(&self, project_id: &str) -> RepoResult<Vec<Unit>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM unit WHERE project_id = ?1 ORDER BY rowid",
            Self::UNIT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![project_id], Self::unit_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn list_versions(&self, unit_id: &str) -> RepoResult<Vec<UnitVersion>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT version_id, unit_id, import_id, unit_number, status, price, \
             update_type, metadata, created_at \
             FROM unit_version WHERE unit_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![unit_id], |row| {
            let metadata_raw: String = row.get(7)?;
            Ok((
                UnitVersion {
                    version_id: row.get(0)?,
                    unit_id: row.get(1)?,
                    import_id: row.get(2)?,
                    unit_number: row.get(3)?,
                    status: UnitStatus::parse(&row.get::<_, String>(4)?),
                    price: row.get(5)?,
                    update_type: UpdateType::parse(&row.get::<_, String>(6)?),
                    metadata: VersionMetadata::Created {
                        original_data: serde_json::Value::Null,
                    },
                    created_at: row.get(8)?,
                },
                metadata_raw,
            ))
        })?;

        let mut versions = Vec::new();
        for entry in rows {
            let (mut version, metadata_raw) = entry?;
            version.metadata = serde_json::from_str(&metadata_raw)?;
            versions.push(version);
        }
        Ok(versions)
    }

    async fn apply_mutations(&self, mutations: &[UnitMutation]) -> RepoResult<()> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        for mutation in mutations {
            match mutation {
                UnitMutation::Create { unit, version } => {
                    Self::insert_unit_tx(&tx, unit)?;
                    Self::insert_version_tx(&tx, version)?;
                }
                UnitMutation::Update { unit, version } => {
                    Self::update_unit_tx(&tx, unit)?;
                    Self::insert_version_tx(&tx, version)?;
                }
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    async fn insert_project(&self, project: &Project) -> RepoResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO project (project_id, name, default_building_id, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                project.project_id,
                project.name,
                project.default_building_id,
                project.created_at,
            ],
        )?;
        Ok(())
    }

    async fn insert_building(&self, building: &Building) -> RepoResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO building (building_id, project_id, name, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                building.building_id,
                building.project_id,
                building.name,
                building.created_at,
            ],
        )?;
        Ok(())
    }

    async fn insert_layout(&self, layout: &Layout) -> RepoResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO layout (layout_id, project_id, name, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                layout.layout_id,
                layout.project_id,
                layout.name,
                layout.created_at,
            ],
        )?;
        Ok(())
    }
}
