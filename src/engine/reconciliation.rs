// ==========================================
// 楼盘单元库存系统 - 库存对账引擎
// ==========================================
// 职责: 导入行集 vs 现有库存 -> 新建/更新/隐式退市
// 设计: 两遍扫描不可合并 —— 退市必须基于导入前的非 SOLD 快照计算,
//       否则本批次新建的单元可能被误当作匹配
// 事务: 全部变更单事务原子应用;有界重试 + 指数退避,禁止递归重试
// ==========================================

use crate::domain::types::{UnitStatus, UpdateType};
use crate::domain::unit::{CanonicalUnit, FieldChanges, Unit, UnitVersion, VersionMetadata};
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::inventory_repo::{InventoryRepository, UnitMutation};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// ReconcileOptions - 对账选项
// ==========================================
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// 匹配到已有单元时是否更新（false 则计入 skipped）
    pub update_existing: bool,
    /// 行级错误返回上限（有界列表）
    pub max_reported_errors: usize,
    /// 事务最大重试次数
    pub tx_max_retries: u32,
    /// 重试基础退避（毫秒,按次数指数放大）
    pub tx_backoff_ms: u64,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            update_existing: true,
            max_reported_errors: 50,
            tx_max_retries: 3,
            tx_backoff_ms: 200,
        }
    }
}

// ==========================================
// ReconcileOutcome - 对账结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    pub created: i64,
    pub updated: i64,
    pub skipped: i64,
    pub marked_as_sold: i64,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

// ==========================================
// ReconcilePlan - 纯计算产物
// ==========================================
// plan_reconciliation 为纯函数,便于脱离数据库测试对账语义
#[derive(Debug, Clone)]
pub struct ReconcilePlan {
    pub mutations: Vec<UnitMutation>,
    pub outcome: ReconcileOutcome,
}

/// 对账计划计算（纯函数）
///
/// # 参数
/// - project_id: 目标项目（新建单元归属）
/// - import_id: 本次导入 ID（写入版本台账）
/// - existing: 项目当前全部单元（含 SOLD,用于自然键匹配）
/// - incoming: 规范化后的导入行,按提交顺序
/// - update_existing: 匹配到已有单元时是否更新
/// - now: 统一时间戳
pub fn plan_reconciliation(
    project_id: &str,
    import_id: &str,
    existing: &[Unit],
    incoming: &[CanonicalUnit],
    update_existing: bool,
    now: DateTime<Utc>,
) -> ReconcilePlan {
    let mut mutations: Vec<UnitMutation> = Vec::new();
    let mut outcome = ReconcileOutcome::default();

    // === 第一遍: 隐式退市 ===
    // 导入被视为权威在售清单: 未被重新提交的非 SOLD 单元推定已售
    let incoming_numbers: HashSet<&str> =
        incoming.iter().map(|u| u.unit_number.as_str()).collect();

    // 匹配工作集: 退市后状态 + 本批次新建,供第二遍自然键查找
    let mut working: Vec<Unit> = existing.to_vec();

    for unit in working.iter_mut() {
        if unit.status == UnitStatus::Sold {
            continue;
        }
        if incoming_numbers.contains(unit.unit_number.as_str()) {
            continue;
        }
        let before_status = unit.status;
        unit.status = UnitStatus::Sold;
        unit.updated_at = now;

        // RESERVED 单元被隐式退市属于可疑情形,提示人工确认
        if before_status == UnitStatus::Reserved {
            outcome.warnings.push(format!(
                "单元 \"{}\" 原为 RESERVED 且未在本次提交中出现,已隐式退市为 SOLD",
                unit.unit_number
            ));
        }

        let version = UnitVersion {
            version_id: Uuid::new_v4().to_string(),
            unit_id: unit.unit_id.clone(),
            import_id: import_id.to_string(),
            unit_number: unit.unit_number.clone(),
            status: UnitStatus::Sold,
            price: unit.price,
            update_type: UpdateType::Update,
            metadata: VersionMetadata::Updated {
                changes: FieldChanges {
                    before: json!({ "status": before_status.as_str() }),
                    after: json!({ "status": UnitStatus::Sold.as_str() }),
                },
            },
            created_at: now,
        };
        mutations.push(UnitMutation::Update {
            unit: unit.clone(),
            version,
        });
        outcome.marked_as_sold += 1;
    }

    // === 第二遍: 按提交顺序应用新建/更新 ===
    for cu in incoming {
        let matched = find_unit_index(&working, &cu.unit_number, cu.building_id.as_deref());
        match matched {
            Some(idx) if update_existing => {
                let before = working[idx].clone();
                let after = apply_partial_update(&before, cu, now);
                let changes = diff_units(&before, &after);

                let version = UnitVersion {
                    version_id: Uuid::new_v4().to_string(),
                    unit_id: after.unit_id.clone(),
                    import_id: import_id.to_string(),
                    unit_number: after.unit_number.clone(),
                    status: after.status,
                    price: after.price,
                    update_type: UpdateType::Update,
                    metadata: VersionMetadata::Updated { changes },
                    created_at: now,
                };
                mutations.push(UnitMutation::Update {
                    unit: after.clone(),
                    version,
                });
                working[idx] = after;
                outcome.updated += 1;
            }
            Some(_) => {
                outcome.skipped += 1;
            }
            None => {
                let Some(building_id) = cu.building_id.clone() else {
                    outcome.errors.push(format!(
                        "第 {} 行: 单元 \"{}\" 无楼栋归属,无法创建",
                        cu.row_number, cu.unit_number
                    ));
                    outcome.skipped += 1;
                    continue;
                };

                let unit = Unit {
                    unit_id: Uuid::new_v4().to_string(),
                    project_id: project_id.to_string(),
                    building_id,
                    layout_id: cu.layout_id.clone(),
                    unit_number: cu.unit_number.clone(),
                    slug: Unit::make_slug(&cu.unit_number),
                    floor_number: cu.floor_number.unwrap_or(0),
                    status: cu.status,
                    price: cu.resolve_price(None),
                    discount_price: cu.discount_price,
                    area: cu.area.unwrap_or(0.0),
                    bedrooms: cu.bedrooms.unwrap_or(0),
                    bathrooms: cu.bathrooms.unwrap_or(0),
                    description: cu.description.clone(),
                    view: cu.view.clone(),
                    created_at: now,
                    updated_at: now,
                };

                let version = UnitVersion {
                    version_id: Uuid::new_v4().to_string(),
                    unit_id: unit.unit_id.clone(),
                    import_id: import_id.to_string(),
                    unit_number: unit.unit_number.clone(),
                    status: unit.status,
                    price: unit.price,
                    update_type: UpdateType::Create,
                    metadata: VersionMetadata::Created {
                        original_data: serde_json::to_value(cu)
                            .unwrap_or(serde_json::Value::Null),
                    },
                    created_at: now,
                };
                mutations.push(UnitMutation::Create {
                    unit: unit.clone(),
                    version,
                });
                working.push(unit);
                outcome.created += 1;
            }
        }
    }

    ReconcilePlan { mutations, outcome }
}

/// 自然键匹配: 楼栋已解析则按 (unit_number, building),否则仅按 unit_number
fn find_unit_index(working: &[Unit], unit_number: &str, building_id: Option<&str>) -> Option<usize> {
    match building_id {
        Some(b) => working
            .iter()
            .position(|u| u.unit_number == unit_number && u.building_id == b),
        None => working.iter().position(|u| u.unit_number == unit_number),
    }
}

/// 字段级部分更新: 行内出现的字段覆盖,缺失字段保留原值
/// slug 每次更新重新生成
fn apply_partial_update(before: &Unit, cu: &CanonicalUnit, now: DateTime<Utc>) -> Unit {
    let mut after = before.clone();
    after.unit_number = cu.unit_number.clone();
    after.slug = Unit::make_slug(&cu.unit_number);
    if let Some(b) = &cu.building_id {
        after.building_id = b.clone();
    }
    if cu.layout_id.is_some() {
        after.layout_id = cu.layout_id.clone();
    }
    if let Some(f) = cu.floor_number {
        after.floor_number = f;
    }
    after.status = cu.status;
    after.price = cu.resolve_price(Some(before.price));
    if cu.discount_price.is_some() {
        after.discount_price = cu.discount_price;
    }
    if let Some(a) = cu.area {
        after.area = a;
    }
    if let Some(b) = cu.bedrooms {
        after.bedrooms = b;
    }
    if let Some(b) = cu.bathrooms {
        after.bathrooms = b;
    }
    if cu.description.is_some() {
        after.description = cu.description.clone();
    }
    if cu.view.is_some() {
        after.view = cu.view.clone();
    }
    after.updated_at = now;
    after
}

/// 计算变更字段的 before/after（slug 与时间戳不入审计明细）
fn diff_units(before: &Unit, after: &Unit) -> FieldChanges {
    let mut b = serde_json::Map::new();
    let mut a = serde_json::Map::new();

    let mut push = |key: &str, bv: serde_json::Value, av: serde_json::Value| {
        if bv != av {
            b.insert(key.to_string(), bv);
            a.insert(key.to_string(), av);
        }
    };

    push("unit_number", json!(before.unit_number), json!(after.unit_number));
    push("building_id", json!(before.building_id), json!(after.building_id));
    push("layout_id", json!(before.layout_id), json!(after.layout_id));
    push("floor_number", json!(before.floor_number), json!(after.floor_number));
    push("status", json!(before.status.as_str()), json!(after.status.as_str()));
    push("price", json!(before.price), json!(after.price));
    push("discount_price", json!(before.discount_price), json!(after.discount_price));
    push("area", json!(before.area), json!(after.area));
    push("bedrooms", json!(before.bedrooms), json!(after.bedrooms));
    push("bathrooms", json!(before.bathrooms), json!(after.bathrooms));
    push("description", json!(before.description), json!(after.description));
    push("view", json!(before.view), json!(after.view));

    FieldChanges {
        before: serde_json::Value::Object(b),
        after: serde_json::Value::Object(a),
    }
}

// ==========================================
// ReconciliationEngine - 对账引擎
// ==========================================
pub struct ReconciliationEngine<R: InventoryRepository> {
    repo: R,
}

impl<R: InventoryRepository> ReconciliationEngine<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// 执行一次对账: 加载快照 -> 纯计算计划 -> 单事务原子应用
    ///
    /// 事务失败整体回滚,向上抛单个批级错误;
    /// busy/locked 类错误走有界重试循环（非递归）
    #[instrument(skip(self, incoming, opts), fields(project_id = %project_id, import_id = %import_id))]
    pub async fn reconcile(
        &self,
        project_id: &str,
        import_id: &str,
        incoming: &[CanonicalUnit],
        opts: &ReconcileOptions,
    ) -> ImportResult<ReconcileOutcome> {
        let existing = self.repo.list_units(project_id).await?;
        debug!(
            existing = existing.len(),
            incoming = incoming.len(),
            "对账快照加载完成"
        );

        let now = Utc::now();
        let plan = plan_reconciliation(
            project_id,
            import_id,
            &existing,
            incoming,
            opts.update_existing,
            now,
        );

        let mut attempt: u32 = 0;
        let max_retries = opts.tx_max_retries.max(1);
        loop {
            match self.repo.apply_mutations(&plan.mutations).await {
                Ok(()) => break,
                Err(e) if e.is_retryable() && attempt + 1 < max_retries => {
                    attempt += 1;
                    let delay_ms = opts
                        .tx_backoff_ms
                        .saturating_mul(1u64 << (attempt - 1).min(8));
                    warn!(
                        attempt = attempt,
                        delay_ms = delay_ms,
                        error = %e,
                        "对账事务冲突,退避后重试"
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(e) => {
                    return Err(ImportError::TransactionFailed(e.to_string()));
                }
            }
        }

        let mut outcome = plan.outcome;
        outcome.errors.truncate(opts.max_reported_errors);
        info!(
            created = outcome.created,
            updated = outcome.updated,
            skipped = outcome.skipped,
            marked_as_sold = outcome.marked_as_sold,
            "对账完成"
        );
        Ok(outcome)
    }
}
