// ==========================================
// 集成测试 - 自动化导入审批门禁
// ==========================================
// 测试目标: 无审批映射的自动化导入被暂存,审批后可重放
// 覆盖范围: UnitImporterImpl 门禁分支 + FieldMappingRepository
// ==========================================

mod test_helpers;

use chrono::Utc;
use estate_inventory::domain::import::{ImportOutcome, ImportRecord};
use estate_inventory::domain::mapping::{CanonicalField, FieldMapping, MappingTarget};
use estate_inventory::domain::types::{AuthContext, UnitStatus};
use estate_inventory::importer::error::ImportError;
use estate_inventory::importer::unit_importer_trait::UnitImporter;
use estate_inventory::logging;
use estate_inventory::repository::error::RepositoryError;
use estate_inventory::repository::import_record_repo::{
    ImportRecordRepository, ImportRecordRepositoryImpl,
};
use estate_inventory::repository::inventory_repo::InventoryRepository;
use estate_inventory::repository::inventory_repo_impl::InventoryRepositoryImpl;
use estate_inventory::repository::mapping_repo::{
    FieldMappingRepository, FieldMappingRepositoryImpl,
};
use serde_json::json;
use std::collections::HashMap;

fn automated() -> AuthContext {
    AuthContext::Automated {
        client: "feed-bot".to_string(),
    }
}

/// 外部列头命名的行数据（需要映射推断）
fn external_rows() -> Vec<estate_inventory::domain::import::RawImportRow> {
    vec![
        test_helpers::row(&[
            ("Unit No", json!("A1")),
            ("Selling Price", json!("100000")),
            ("楼层", json!(5)),
        ]),
        test_helpers::row(&[
            ("Unit No", json!("A2")),
            ("Selling Price", json!("200000")),
            ("楼层", json!(6)),
        ]),
    ]
}

// ==========================================
// 测试用例 1: 无审批映射 -> 暂存,零库存变更
// ==========================================

#[tokio::test]
async fn test_ungated_automated_import_held_without_mutation() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    test_helpers::seed_project(&db_path).expect("Failed to seed project");
    let importer = test_helpers::create_importer(&db_path);

    let outcome = importer
        .import_units("P1", test_helpers::snapshot(external_rows()), None, &automated())
        .await
        .expect("门禁拦截不是错误");

    let (import_id, mapping_id) = match outcome {
        ImportOutcome::PendingApproval {
            import_id,
            field_mapping_id,
        } => (import_id, field_mapping_id),
        other => panic!("期望 PendingApproval,实际 {:?}", other),
    };

    // 库存零变更
    let inventory = InventoryRepositoryImpl::new(&db_path).expect("Failed to create repo");
    assert!(inventory.list_units("P1").await.unwrap().is_empty());

    // 落库内容: 未审批映射 + processed=false 的导入记录
    let mappings = FieldMappingRepositoryImpl::new(&db_path).expect("Failed to create repo");
    let mapping = mappings
        .get(&mapping_id)
        .await
        .unwrap()
        .expect("推断映射应已落库");
    assert!(!mapping.is_approved);
    assert!(!mapping.is_default);

    let records = ImportRecordRepositoryImpl::new(&db_path).expect("Failed to create repo");
    let record = records.get(&import_id).await.unwrap().expect("导入记录应存在");
    assert!(!record.processed);
    assert_eq!(record.total_units, 2);
    assert_eq!(record.field_mapping_id.as_deref(), Some(mapping_id.as_str()));
}

// ==========================================
// 测试用例 2: 审批后重放待处理导入
// ==========================================

#[tokio::test]
async fn test_process_pending_after_approval() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    test_helpers::seed_project(&db_path).expect("Failed to seed project");
    let importer = test_helpers::create_importer(&db_path);

    let outcome = importer
        .import_units("P1", test_helpers::snapshot(external_rows()), None, &automated())
        .await
        .expect("门禁拦截不是错误");
    let (import_id, mapping_id) = match outcome {
        ImportOutcome::PendingApproval {
            import_id,
            field_mapping_id,
        } => (import_id, field_mapping_id),
        other => panic!("期望 PendingApproval,实际 {:?}", other),
    };

    // 审批未通过时重放被拒绝
    let err = importer
        .process_pending("P1", &import_id, &automated())
        .await
        .expect_err("未审批映射不可重放");
    assert!(matches!(err, ImportError::MappingNotApproved(_)));

    // 带外审批
    let mappings = FieldMappingRepositoryImpl::new(&db_path).expect("Failed to create repo");
    mappings.set_approved(&mapping_id, true).await.unwrap();

    let summary = importer
        .process_pending("P1", &import_id, &automated())
        .await
        .expect("审批后重放应成功");
    assert_eq!(summary.created, 2);
    assert_eq!(summary.total, 2);

    // 推断映射生效: 外部列头被正确翻译
    let inventory = InventoryRepositoryImpl::new(&db_path).expect("Failed to create repo");
    let units = inventory.list_units("P1").await.unwrap();
    assert_eq!(units.len(), 2);
    let a1 = units.iter().find(|u| u.unit_number == "A1").unwrap();
    assert_eq!(a1.price, 100000.0);
    assert_eq!(a1.floor_number, 5);
    assert_eq!(a1.status, UnitStatus::Available);

    // 终态 processed=true,不可重复执行
    let records = ImportRecordRepositoryImpl::new(&db_path).expect("Failed to create repo");
    assert!(records.get(&import_id).await.unwrap().unwrap().processed);

    let err = importer
        .process_pending("P1", &import_id, &automated())
        .await
        .expect_err("已处理导入不可重复执行");
    assert!(matches!(err, ImportError::ImportAlreadyProcessed(_)));
}

// ==========================================
// 测试用例 3: 已审批默认映射直接放行自动化导入
// ==========================================

#[tokio::test]
async fn test_automated_import_with_approved_default_mapping() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    test_helpers::seed_project(&db_path).expect("Failed to seed project");
    let importer = test_helpers::create_importer(&db_path);

    // 第一次拦截产出映射,审批并设为项目默认
    let outcome = importer
        .import_units("P1", test_helpers::snapshot(external_rows()), None, &automated())
        .await
        .unwrap();
    let mapping_id = match outcome {
        ImportOutcome::PendingApproval {
            field_mapping_id, ..
        } => field_mapping_id,
        other => panic!("期望 PendingApproval,实际 {:?}", other),
    };
    let mappings = FieldMappingRepositoryImpl::new(&db_path).expect("Failed to create repo");
    mappings.set_approved(&mapping_id, true).await.unwrap();
    mappings.set_default("P1", &mapping_id).await.unwrap();

    // 第二次自动化导入直接执行对账
    let outcome = importer
        .import_units("P1", test_helpers::snapshot(external_rows()), None, &automated())
        .await
        .unwrap();
    match outcome {
        ImportOutcome::Completed { summary, .. } => {
            assert_eq!(summary.created, 2);
        }
        other => panic!("期望 Completed,实际 {:?}", other),
    }
}

// ==========================================
// 测试用例 4: 显式指定未审批映射的自动化导入被拒绝
// ==========================================

#[tokio::test]
async fn test_automated_explicit_unapproved_mapping_rejected() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    test_helpers::seed_project(&db_path).expect("Failed to seed project");
    let importer = test_helpers::create_importer(&db_path);

    let outcome = importer
        .import_units("P1", test_helpers::snapshot(external_rows()), None, &automated())
        .await
        .unwrap();
    let mapping_id = match outcome {
        ImportOutcome::PendingApproval {
            field_mapping_id, ..
        } => field_mapping_id,
        other => panic!("期望 PendingApproval,实际 {:?}", other),
    };

    let err = importer
        .import_units(
            "P1",
            test_helpers::snapshot(external_rows()),
            Some(mapping_id),
            &automated(),
        )
        .await
        .expect_err("未审批映射不可用于自动化导入");
    assert!(matches!(err, ImportError::MappingNotApproved(_)));
}

// ==========================================
// 测试用例 5: 门禁暂存为单事务,记录落库失败不残留孤儿映射
// ==========================================

#[tokio::test]
async fn test_pending_hold_is_atomic_no_orphan_mapping() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    test_helpers::seed_project(&db_path).expect("Failed to seed project");

    let records = ImportRecordRepositoryImpl::new(&db_path).expect("Failed to create repo");
    let mappings = FieldMappingRepositoryImpl::new(&db_path).expect("Failed to create repo");

    let now = Utc::now();
    let mk_mapping = |id: &str| FieldMapping {
        mapping_id: id.to_string(),
        project_id: "P1".to_string(),
        name: format!("推断映射 {}", id),
        mappings: HashMap::from([(
            "Unit No".to_string(),
            MappingTarget::Field(CanonicalField::UnitNumber),
        )]),
        is_default: false,
        is_approved: false,
        created_at: now,
        updated_at: now,
    };
    let mk_record = |mapping_id: &str| ImportRecord {
        import_id: "IMP-HOLD".to_string(),
        project_id: "P1".to_string(),
        imported_by: "feed-bot".to_string(),
        total_units: 1,
        created_units: 0,
        updated_units: 0,
        skipped_units: 0,
        processed: false,
        raw_data: "{\"data\":[]}".to_string(),
        field_mapping_id: Some(mapping_id.to_string()),
        created_at: now,
        updated_at: now,
    };

    records
        .insert_pending(&mk_mapping("M-HOLD-1"), &mk_record("M-HOLD-1"))
        .await
        .expect("首次暂存应成功");

    // 同 import_id 重复暂存: 记录主键冲突,映射插入随之回滚
    let err = records
        .insert_pending(&mk_mapping("M-HOLD-2"), &mk_record("M-HOLD-2"))
        .await
        .expect_err("重复 import_id 应失败");
    assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));

    assert!(mappings.get("M-HOLD-1").await.unwrap().is_some());
    assert!(mappings.get("M-HOLD-2").await.unwrap().is_none(), "孤儿映射不应残留");
    let record = records.get("IMP-HOLD").await.unwrap().expect("首次记录仍在");
    assert_eq!(record.field_mapping_id.as_deref(), Some("M-HOLD-1"));
}
