// ==========================================
// 楼盘单元库存系统 - 导入领域模型
// ==========================================
// 职责: 导入记录 / 请求快照 / 结果汇总
// 红线: import_record 在处理前创建,raw_data 为可重放的事实来源
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 原始导入行: 未经信任的键值对（仅存活于一次导入调用内）
pub type RawImportRow = HashMap<String, serde_json::Value>;

// ==========================================
// ImportRecord - 导入记录
// ==========================================
// 每次导入尝试一条;处理前落库,事务提交后回填计数
// 不变式: 处理完成后 total_units = created + updated + skipped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRecord {
    pub import_id: String,                // 导入 ID（UUID）
    pub project_id: String,               // 归属项目
    pub imported_by: String,              // 操作者（交互用户或自动化客户端）
    pub total_units: i64,                 // 提交行数
    pub created_units: i64,               // 新建数
    pub updated_units: i64,               // 更新数
    pub skipped_units: i64,               // 跳过数（含行级错误）
    pub processed: bool,                  // 是否已完成对账
    pub raw_data: String,                 // 请求快照 JSON（可重放）
    pub field_mapping_id: Option<String>, // 使用的映射
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// ImportSnapshot - 存储在 raw_data 中的请求快照
// ==========================================
// process-pending 重放时反序列化此结构
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSnapshot {
    pub data: Vec<RawImportRow>,
    #[serde(default = "default_update_existing")]
    pub update_existing: bool,
    #[serde(default)]
    pub default_building_id: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub price_update_date: Option<String>,
}

fn default_update_existing() -> bool {
    true
}

// ==========================================
// ImportSummary - 单次导入结果汇总
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub success: bool,
    pub total: i64,          // 提交行数
    pub processed: i64,      // 实际落库行数（created + updated）
    pub created: i64,
    pub updated: i64,
    pub skipped: i64,
    pub marked_as_sold: i64, // 隐式退市数
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

// ==========================================
// ImportOutcome - 导入调用的两种终态
// ==========================================
// Completed: 对账已执行
// PendingApproval: 自动化导入被门禁拦截,等待映射审批
#[derive(Debug, Clone)]
pub enum ImportOutcome {
    Completed {
        import_id: String,
        summary: ImportSummary,
    },
    PendingApproval {
        import_id: String,
        field_mapping_id: String,
    },
}
