// ==========================================
// 楼盘单元库存系统 - 命令行主入口
// ==========================================
// 用途: 对指定项目执行一次交互式导入（行数据来自 JSON 文件）
// 用法: estate-inventory <db路径> <项目ID> <行数据.json>
// ==========================================

use anyhow::{anyhow, Context};
use estate_inventory::config::config_manager::ConfigManager;
use estate_inventory::db;
use estate_inventory::domain::import::{ImportOutcome, ImportSnapshot, RawImportRow};
use estate_inventory::domain::types::AuthContext;
use estate_inventory::importer::unit_importer_impl::UnitImporterImpl;
use estate_inventory::importer::unit_importer_trait::UnitImporter;
use estate_inventory::repository::import_record_repo::ImportRecordRepositoryImpl;
use estate_inventory::repository::inventory_repo_impl::InventoryRepositoryImpl;
use estate_inventory::repository::mapping_repo::FieldMappingRepositoryImpl;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    estate_inventory::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} - 库存对账核心", estate_inventory::APP_NAME);
    tracing::info!("系统版本: {}", estate_inventory::VERSION);
    tracing::info!("==================================================");

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        return Err(anyhow!("用法: {} <db路径> <项目ID> <行数据.json>", args[0]));
    }
    let db_path = &args[1];
    let project_id = &args[2];
    let rows_path = &args[3];

    tracing::info!("使用数据库: {}", db_path);
    let conn = Connection::open(db_path).with_context(|| format!("打开数据库失败: {}", db_path))?;
    db::configure_sqlite_connection(&conn)?;
    db::init_schema(&conn)?;
    let conn = Arc::new(Mutex::new(conn));

    let inventory_repo = InventoryRepositoryImpl::from_connection(conn.clone())
        .map_err(|e| anyhow!("初始化库存仓储失败: {}", e))?;
    let mapping_repo = FieldMappingRepositoryImpl::from_connection(conn.clone())
        .map_err(|e| anyhow!("初始化映射仓储失败: {}", e))?;
    let import_repo = ImportRecordRepositoryImpl::from_connection(conn.clone())
        .map_err(|e| anyhow!("初始化导入记录仓储失败: {}", e))?;
    let config = ConfigManager::from_connection(conn)
        .map_err(|e| anyhow!("初始化配置管理器失败: {}", e))?;

    let importer = UnitImporterImpl::new(inventory_repo, mapping_repo, import_repo, config);

    let raw = std::fs::read_to_string(rows_path)
        .with_context(|| format!("读取行数据文件失败: {}", rows_path))?;
    let data: Vec<RawImportRow> =
        serde_json::from_str(&raw).with_context(|| format!("解析行数据失败: {}", rows_path))?;
    tracing::info!("已加载 {} 行数据", data.len());

    let snapshot = ImportSnapshot {
        data,
        update_existing: true,
        default_building_id: None,
        currency: None,
        price_update_date: None,
    };
    let auth = AuthContext::Interactive {
        user: whoami(),
    };

    let outcome = importer
        .import_units(project_id, snapshot, None, &auth)
        .await
        .map_err(|e| anyhow!("导入失败: {}", e))?;

    match outcome {
        ImportOutcome::Completed { import_id, summary } => {
            tracing::info!("导入 {} 完成", import_id);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        ImportOutcome::PendingApproval {
            import_id,
            field_mapping_id,
        } => {
            println!(
                "导入已暂存待审批: import_id={} field_mapping_id={}",
                import_id, field_mapping_id
            );
        }
    }
    Ok(())
}

fn whoami() -> String {
    std::env::var("USER").unwrap_or_else(|_| "cli".to_string())
}
