// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、种子数据、导入器构建
// ==========================================

use chrono::Utc;
use estate_inventory::config::config_manager::ConfigManager;
use estate_inventory::db;
use estate_inventory::domain::import::{ImportSnapshot, RawImportRow};
use estate_inventory::importer::unit_importer_impl::UnitImporterImpl;
use estate_inventory::repository::import_record_repo::ImportRecordRepositoryImpl;
use estate_inventory::repository::inventory_repo_impl::InventoryRepositoryImpl;
use estate_inventory::repository::mapping_repo::FieldMappingRepositoryImpl;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::error::Error;
use tempfile::NamedTempFile;

pub type TestImporter = UnitImporterImpl<
    InventoryRepositoryImpl,
    FieldMappingRepositoryImpl,
    ImportRecordRepositoryImpl,
    ConfigManager,
>;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径非法")?
        .to_string();

    let conn = Connection::open(&db_path)?;
    db::configure_sqlite_connection(&conn)?;
    db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 播种测试项目: P1 + 楼栋 B1(Tower A)/B2(Tower B) + 户型 L1(两室一厅)
pub fn seed_project(db_path: &str) -> Result<(), Box<dyn Error>> {
    let conn = Connection::open(db_path)?;
    let now = Utc::now();
    conn.execute(
        "INSERT INTO project (project_id, name, default_building_id, created_at) \
         VALUES ('P1', '示例项目', NULL, ?1)",
        params![now],
    )?;
    conn.execute(
        "INSERT INTO building (building_id, project_id, name, created_at) \
         VALUES ('B1', 'P1', 'Tower A', ?1)",
        params![now],
    )?;
    conn.execute(
        "INSERT INTO building (building_id, project_id, name, created_at) \
         VALUES ('B2', 'P1', 'Tower B', ?1)",
        params![now],
    )?;
    conn.execute(
        "INSERT INTO layout (layout_id, project_id, name, created_at) \
         VALUES ('L1', 'P1', '两室一厅', ?1)",
        params![now],
    )?;
    Ok(())
}

/// 创建测试用导入器（各仓储独立连接同一数据库文件）
pub fn create_importer(db_path: &str) -> TestImporter {
    let inventory_repo =
        InventoryRepositoryImpl::new(db_path).expect("Failed to create inventory repo");
    let mapping_repo =
        FieldMappingRepositoryImpl::new(db_path).expect("Failed to create mapping repo");
    let import_repo =
        ImportRecordRepositoryImpl::new(db_path).expect("Failed to create import repo");
    let config = ConfigManager::new(db_path).expect("Failed to create config");
    UnitImporterImpl::new(inventory_repo, mapping_repo, import_repo, config)
}

/// 构造一行原始数据
pub fn row(pairs: &[(&str, serde_json::Value)]) -> RawImportRow {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect::<HashMap<_, _>>()
}

/// 构造导入快照（updateExisting=true,无请求级默认楼栋）
pub fn snapshot(data: Vec<RawImportRow>) -> ImportSnapshot {
    ImportSnapshot {
        data,
        update_existing: true,
        default_building_id: None,
        currency: None,
        price_update_date: None,
    }
}
