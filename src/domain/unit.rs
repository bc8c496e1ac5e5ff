// ==========================================
// 楼盘单元库存系统 - 单元领域模型
// ==========================================
// 职责: 持久化单元 / 标准化行 / 版本台账
// 红线: 导入不物理删除单元,退市 = 状态迁移到 SOLD
// ==========================================

use crate::domain::types::{UnitStatus, UpdateType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Unit - 持久化单元记录
// ==========================================
// 每个物理单元一行,归属项目;由对账 create/update 变更
// 自然键: (project_id, unit_number, building_id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub unit_id: String,               // 单元 ID（UUID）
    pub project_id: String,            // 归属项目
    pub building_id: String,           // 归属楼栋（单元必须有楼栋）
    pub layout_id: Option<String>,     // 户型（可缺失,降级导入）
    pub unit_number: String,           // 单元号（楼栋内唯一的自然键）
    pub slug: String,                  // URL 标识（每次更新重新生成）
    pub floor_number: i64,             // 楼层（缺失默认 0）
    pub status: UnitStatus,            // 销售状态
    pub price: f64,                    // 成交口径价格（优先级解析结果）
    pub discount_price: Option<f64>,   // 折扣价
    pub area: f64,                     // 面积（缺失默认 0）
    pub bedrooms: i64,                 // 卧室数（缺失默认 0）
    pub bathrooms: i64,                // 卫生间数（缺失默认 0）
    pub description: Option<String>,   // 描述
    pub view: Option<String>,          // 景观/朝向
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Unit {
    /// 生成 slug: 单元号清洗 + 短随机后缀（更新时重新生成,保证唯一）
    pub fn make_slug(unit_number: &str) -> String {
        let base: String = unit_number
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        let base = base.trim_matches('-').to_string();
        let suffix = &uuid::Uuid::new_v4().to_string()[..8];
        if base.is_empty() {
            format!("unit-{}", suffix)
        } else {
            format!("{}-{}", base, suffix)
        }
    }
}

// ==========================================
// CanonicalUnit - 标准化导入行
// ==========================================
// 行规范化器输出;生命周期仅在一次导入内
// 不变式: unit_number 非空（空号行在规范化阶段被拒绝）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalUnit {
    pub unit_number: String,              // 必填,自然键
    pub floor_number: Option<i64>,        // 楼层
    pub building_id: Option<String>,      // 已解析楼栋（规范化阶段解析）
    pub layout_id: Option<String>,        // 已解析户型（不可解析则 None + 警告）
    pub status: UnitStatus,               // 默认 AVAILABLE
    pub base_price_excl_vat: Option<f64>, // 价格优先级 ①
    pub final_price_incl_vat: Option<f64>, // 价格优先级 ②
    pub selling_price: Option<f64>,       // 价格优先级 ③
    pub discount_price: Option<f64>,
    pub area: Option<f64>,
    pub bedrooms: Option<i64>,
    pub bathrooms: Option<i64>,
    pub description: Option<String>,
    pub view: Option<String>,
    pub row_number: usize, // 源数据行号（从 1 起,用于错误定位）
}

impl CanonicalUnit {
    /// 价格优先级解析: base_excl_vat -> final_incl_vat -> selling -> 已存价格 -> 0
    /// existing 仅在更新场景传入既有单元的存量价格
    pub fn resolve_price(&self, existing: Option<f64>) -> f64 {
        self.base_price_excl_vat
            .or(self.final_price_incl_vat)
            .or(self.selling_price)
            .or(existing)
            .unwrap_or(0.0)
    }
}

// ==========================================
// VersionMetadata - 版本记录元数据
// ==========================================
// CREATE: 保留完整原始标准化数据
// UPDATE: 仅保留变更字段的 before/after
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VersionMetadata {
    Created {
        original_data: serde_json::Value,
    },
    Updated {
        changes: FieldChanges,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldChanges {
    pub before: serde_json::Value,
    pub after: serde_json::Value,
}

// ==========================================
// UnitVersion - 单元版本台账
// ==========================================
// 红线: 仅追加,永不更新/删除;与单元变更同事务写入
// 每次导入引发的每个单元变更恰好一条
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitVersion {
    pub version_id: String,       // 版本 ID（UUID）
    pub unit_id: String,          // 关联单元
    pub import_id: String,        // 引发变更的导入
    pub unit_number: String,      // 变更后单元号快照
    pub status: UnitStatus,       // 变更后状态快照
    pub price: f64,               // 变更后价格快照
    pub update_type: UpdateType,  // CREATE / UPDATE
    pub metadata: VersionMetadata, // 变更明细
    pub created_at: DateTime<Utc>,
}
