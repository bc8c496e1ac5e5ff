// ==========================================
// 集成测试 - 导入对账完整流程
// ==========================================
// 测试目标: 交互式导入的新建/更新/隐式退市/行级错误语义
// 覆盖范围: UnitImporterImpl + ReconciliationEngine + 各仓储
// ==========================================

mod test_helpers;

use estate_inventory::domain::import::{ImportOutcome, ImportSummary};
use estate_inventory::domain::types::{AuthContext, UnitStatus, UpdateType};
use estate_inventory::importer::unit_importer_trait::UnitImporter;
use estate_inventory::logging;
use estate_inventory::repository::import_record_repo::{
    ImportRecordRepository, ImportRecordRepositoryImpl,
};
use estate_inventory::repository::inventory_repo::InventoryRepository;
use estate_inventory::repository::inventory_repo_impl::InventoryRepositoryImpl;
use serde_json::json;

fn interactive() -> AuthContext {
    AuthContext::Interactive {
        user: "tester".to_string(),
    }
}

fn completed(outcome: ImportOutcome) -> (String, ImportSummary) {
    match outcome {
        ImportOutcome::Completed { import_id, summary } => (import_id, summary),
        other => panic!("期望 Completed,实际 {:?}", other),
    }
}

// ==========================================
// 测试用例 1: 首次导入全部新建
// ==========================================

#[tokio::test]
async fn test_first_import_creates_units() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    test_helpers::seed_project(&db_path).expect("Failed to seed project");
    let importer = test_helpers::create_importer(&db_path);

    let rows = vec![
        test_helpers::row(&[
            ("unit_number", json!("A1")),
            ("building", json!("Tower A")),
            ("floor_number", json!(3)),
            ("selling_price", json!(120000)),
            ("bedrooms", json!("2")),
        ]),
        test_helpers::row(&[
            ("unit_number", json!("A2")),
            ("building", json!("Tower A")),
            ("selling_price", json!("95,000")),
        ]),
    ];
    let outcome = importer
        .import_units("P1", test_helpers::snapshot(rows), None, &interactive())
        .await
        .expect("导入应该成功");
    let (import_id, summary) = completed(outcome);

    assert!(summary.success);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.created, 2);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.marked_as_sold, 0);

    let inventory = InventoryRepositoryImpl::new(&db_path).expect("Failed to create repo");
    let units = inventory.list_units("P1").await.expect("查询单元失败");
    assert_eq!(units.len(), 2);

    let a1 = units.iter().find(|u| u.unit_number == "A1").unwrap();
    assert_eq!(a1.building_id, "B1");
    assert_eq!(a1.floor_number, 3);
    assert_eq!(a1.price, 120000.0);
    assert_eq!(a1.bedrooms, 2);
    assert_eq!(a1.status, UnitStatus::Available);

    // 千分位价格被清洗
    let a2 = units.iter().find(|u| u.unit_number == "A2").unwrap();
    assert_eq!(a2.price, 95000.0);

    // 每个新建单元恰好一条 CREATE 版本,归属本次导入
    for unit in &units {
        let versions = inventory
            .list_versions(&unit.unit_id)
            .await
            .expect("查询版本失败");
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].update_type, UpdateType::Create);
        assert_eq!(versions[0].import_id, import_id);
    }
}

// ==========================================
// 测试用例 2: 幂等重导入
// ==========================================

#[tokio::test]
async fn test_idempotent_reimport() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    test_helpers::seed_project(&db_path).expect("Failed to seed project");
    let importer = test_helpers::create_importer(&db_path);

    let rows = || {
        vec![
            test_helpers::row(&[("unit_number", json!("A1")), ("selling_price", json!(100))]),
            test_helpers::row(&[("unit_number", json!("A2")), ("selling_price", json!(200))]),
        ]
    };

    let (_, first) = completed(
        importer
            .import_units("P1", test_helpers::snapshot(rows()), None, &interactive())
            .await
            .expect("首次导入失败"),
    );
    assert_eq!(first.created, 2);

    let (_, second) = completed(
        importer
            .import_units("P1", test_helpers::snapshot(rows()), None, &interactive())
            .await
            .expect("重导入失败"),
    );
    // 同一行集重复提交: 不新建重复单元,全部走更新
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 2);
    assert_eq!(second.marked_as_sold, 0);

    let inventory = InventoryRepositoryImpl::new(&db_path).expect("Failed to create repo");
    assert_eq!(inventory.list_units("P1").await.unwrap().len(), 2);
}

// ==========================================
// 测试用例 3: A1 更新 + A2 隐式退市（核心场景）
// ==========================================

#[tokio::test]
async fn test_update_and_implicit_retirement() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    test_helpers::seed_project(&db_path).expect("Failed to seed project");
    let importer = test_helpers::create_importer(&db_path);

    let first_rows = vec![
        test_helpers::row(&[("unit_number", json!("A1")), ("selling_price", json!(100))]),
        test_helpers::row(&[("unit_number", json!("A2")), ("selling_price", json!(200))]),
    ];
    completed(
        importer
            .import_units("P1", test_helpers::snapshot(first_rows), None, &interactive())
            .await
            .expect("首次导入失败"),
    );

    // 第二次仅提交 A1,售价 500000
    let second_rows = vec![test_helpers::row(&[
        ("unit_number", json!("A1")),
        ("selling_price", json!(500000)),
    ])];
    let (import_id, summary) = completed(
        importer
            .import_units("P1", test_helpers::snapshot(second_rows), None, &interactive())
            .await
            .expect("第二次导入失败"),
    );

    assert_eq!(summary.updated, 1);
    assert_eq!(summary.marked_as_sold, 1);
    assert_eq!(summary.created, 0);

    let inventory = InventoryRepositoryImpl::new(&db_path).expect("Failed to create repo");
    let units = inventory.list_units("P1").await.unwrap();
    let a1 = units.iter().find(|u| u.unit_number == "A1").unwrap();
    let a2 = units.iter().find(|u| u.unit_number == "A2").unwrap();
    assert_eq!(a1.price, 500000.0);
    assert_eq!(a1.status, UnitStatus::Available);
    // A2 未被重新提交 -> 推定已售,不物理删除
    assert_eq!(a2.status, UnitStatus::Sold);

    // 本次导入为 A1/A2 各追加一条 UPDATE 版本
    for unit in [a1, a2] {
        let versions = inventory.list_versions(&unit.unit_id).await.unwrap();
        assert_eq!(versions.len(), 2);
        let latest = versions.last().unwrap();
        assert_eq!(latest.update_type, UpdateType::Update);
        assert_eq!(latest.import_id, import_id);
    }

    // 导入记录计数回填且 processed=true
    let records = ImportRecordRepositoryImpl::new(&db_path).expect("Failed to create repo");
    let record = records
        .get(&import_id)
        .await
        .unwrap()
        .expect("导入记录应存在");
    assert!(record.processed);
    assert_eq!(record.total_units, 1);
    assert_eq!(record.updated_units, 1);
    assert_eq!(
        record.total_units,
        record.created_units + record.updated_units + record.skipped_units
    );
}

// ==========================================
// 测试用例 4: 缺失单元号的行被跳过,批次继续
// ==========================================

#[tokio::test]
async fn test_missing_unit_number_row_skipped() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    test_helpers::seed_project(&db_path).expect("Failed to seed project");
    let importer = test_helpers::create_importer(&db_path);

    let rows = vec![
        test_helpers::row(&[("unit_number", json!("A1"))]),
        // 单元号为空白 -> 行级错误
        test_helpers::row(&[("unit_number", json!("   ")), ("selling_price", json!(100))]),
    ];
    let (_, summary) = completed(
        importer
            .import_units("P1", test_helpers::snapshot(rows), None, &interactive())
            .await
            .expect("导入失败"),
    );

    assert_eq!(summary.total, 2);
    assert_eq!(summary.created, 1);
    assert_eq!(summary.skipped, 1);
    assert!(!summary.errors.is_empty());
    assert!(summary.errors[0].contains("第 2 行"));
}

// ==========================================
// 测试用例 5: 价格优先级
// ==========================================

#[tokio::test]
async fn test_price_precedence_on_create() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    test_helpers::seed_project(&db_path).expect("Failed to seed project");
    let importer = test_helpers::create_importer(&db_path);

    let rows = vec![test_helpers::row(&[
        ("unit_number", json!("A1")),
        ("base_price_excl_vat", json!(100)),
        ("final_price_incl_vat", json!(110)),
        ("selling_price", json!(120)),
    ])];
    completed(
        importer
            .import_units("P1", test_helpers::snapshot(rows), None, &interactive())
            .await
            .expect("导入失败"),
    );

    let inventory = InventoryRepositoryImpl::new(&db_path).expect("Failed to create repo");
    let units = inventory.list_units("P1").await.unwrap();
    // 不含税基准价最优先
    assert_eq!(units[0].price, 100.0);
}

// ==========================================
// 测试用例 6: 户型不可解析降级为警告
// ==========================================

#[tokio::test]
async fn test_unresolved_layout_degrades_with_warning() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    test_helpers::seed_project(&db_path).expect("Failed to seed project");
    let importer = test_helpers::create_importer(&db_path);

    let rows = vec![test_helpers::row(&[
        ("unit_number", json!("A1")),
        ("layout_id", json!("不存在的户型")),
    ])];
    let (_, summary) = completed(
        importer
            .import_units("P1", test_helpers::snapshot(rows), None, &interactive())
            .await
            .expect("导入失败"),
    );

    assert_eq!(summary.created, 1);
    assert!(!summary.warnings.is_empty());

    let inventory = InventoryRepositoryImpl::new(&db_path).expect("Failed to create repo");
    let units = inventory.list_units("P1").await.unwrap();
    assert!(units[0].layout_id.is_none());
}

// ==========================================
// 测试用例 7: updateExisting=false 时匹配行跳过
// ==========================================

#[tokio::test]
async fn test_update_existing_false_skips_matches() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    test_helpers::seed_project(&db_path).expect("Failed to seed project");
    let importer = test_helpers::create_importer(&db_path);

    let rows = vec![test_helpers::row(&[
        ("unit_number", json!("A1")),
        ("selling_price", json!(100)),
    ])];
    completed(
        importer
            .import_units("P1", test_helpers::snapshot(rows.clone()), None, &interactive())
            .await
            .expect("首次导入失败"),
    );

    let mut snapshot = test_helpers::snapshot(rows);
    snapshot.update_existing = false;
    let (_, summary) = completed(
        importer
            .import_units("P1", snapshot, None, &interactive())
            .await
            .expect("第二次导入失败"),
    );

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.created, 0);

    // 价格保持首次导入值
    let inventory = InventoryRepositoryImpl::new(&db_path).expect("Failed to create repo");
    assert_eq!(inventory.list_units("P1").await.unwrap()[0].price, 100.0);
}

// ==========================================
// 测试用例 8: 项目不存在 -> 批级失败
// ==========================================

#[tokio::test]
async fn test_missing_project_fails_whole_import() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    test_helpers::seed_project(&db_path).expect("Failed to seed project");
    let importer = test_helpers::create_importer(&db_path);

    let rows = vec![test_helpers::row(&[("unit_number", json!("A1"))])];
    let result = importer
        .import_units("不存在的项目", test_helpers::snapshot(rows), None, &interactive())
        .await;
    assert!(result.is_err());
}
